//! Lifecycle runner: init, per-icon process, finish.
//!
//! # Responsibility
//! - Call `init` on every extension, then `process` per icon on the
//!   extensions that icon declares, then `finish` on every extension.
//! - Log and collect recoverable per-icon failures without aborting.
//!
//! # Invariants
//! - Phases run strictly in order: `Created -> Initialized -> Running ->
//!   Finished`; any other request is a `Lifecycle` error.
//! - Icons are processed in catalog order; within one icon, extensions run
//!   in execution order.
//! - A failed `process` call skips only that (icon, extension) pair.

use std::time::Instant;

use log::{debug, error, info, warn};

use crate::catalog::IconRecord;
use crate::error::{WebfontError, WebfontResult};
use crate::extension::{
    Capability, IconHandle, IconProcessingError, ResolvedExtensions, RunContext, StateStore,
};
use crate::options::Configuration;

/// Lifecycle position of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    Initialized,
    /// Processing the icon at this catalog index.
    Running { icon: usize },
    Finished,
}

/// Drives one run over a fixed set of icons and extensions.
pub struct PipelineRunner<'a> {
    config: &'a Configuration,
    extensions: &'a ResolvedExtensions,
    icons: Vec<IconRecord>,
    states: StateStore,
    state: RunnerState,
    skipped: Vec<IconProcessingError>,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        config: &'a Configuration,
        extensions: &'a ResolvedExtensions,
        icons: Vec<IconRecord>,
    ) -> Self {
        Self {
            config,
            extensions,
            icons,
            states: StateStore::new(),
            state: RunnerState::Created,
            skipped: Vec::new(),
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn icons(&self) -> &[IconRecord] {
        &self.icons
    }

    /// `Created -> Initialized`.
    pub fn init(&mut self) -> WebfontResult<()> {
        if self.state != RunnerState::Created {
            return Err(WebfontError::Lifecycle {
                expected: "created",
                actual: self.state,
            });
        }
        self.run_phase(Capability::Init)?;
        self.state = RunnerState::Initialized;
        Ok(())
    }

    /// `Initialized -> Running(icon_1..icon_n)`.
    pub fn process_icons(&mut self) -> WebfontResult<()> {
        if self.state != RunnerState::Initialized {
            return Err(WebfontError::Lifecycle {
                expected: "initialized",
                actual: self.state,
            });
        }
        let started_at = Instant::now();
        let config = self.config;
        let extensions = self.extensions;
        for index in 0..self.icons.len() {
            self.state = RunnerState::Running { icon: index };
            let dispatch = extensions.for_icon(&self.icons[index]);
            for entry in dispatch {
                let mut cx = RunContext::new(entry, config, extensions, &mut self.states);
                let mut icon = IconHandle::new(&mut self.icons[index], entry);
                match entry.extension.process(&mut icon, &mut cx) {
                    Ok(()) => debug!(
                        "event=icon_processed module=pipeline status=ok icon={} extension={}",
                        self.icons[index].name, entry.tag
                    ),
                    Err(err) => {
                        warn!(
                            "event=icon_skipped module=pipeline status=skip icon={} extension={} reason={}",
                            err.icon, err.extension, err.reason
                        );
                        self.skipped.push(err);
                    }
                }
            }
        }
        if self.icons.is_empty() {
            self.state = RunnerState::Running { icon: 0 };
        }
        info!(
            "event=phase_done module=pipeline status=ok phase=process icons={} skipped={} duration_ms={}",
            self.icons.len(),
            self.skipped.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// `Running -> Finished`; runs even when icons were skipped.
    pub fn finish(mut self) -> WebfontResult<RunReport> {
        if !matches!(self.state, RunnerState::Running { .. }) {
            return Err(WebfontError::Lifecycle {
                expected: "running",
                actual: self.state,
            });
        }
        self.run_phase(Capability::Finish)?;
        self.state = RunnerState::Finished;
        Ok(RunReport {
            icons: self.icons,
            skipped: self.skipped,
            states: self.states,
        })
    }

    /// All three phases in order.
    pub fn run(mut self) -> WebfontResult<RunReport> {
        self.init()?;
        self.process_icons()?;
        self.finish()
    }

    fn run_phase(&mut self, phase: Capability) -> WebfontResult<()> {
        let started_at = Instant::now();
        let config = self.config;
        let extensions = self.extensions;
        for entry in extensions.with_capability(phase) {
            let mut cx = RunContext::new(entry, config, extensions, &mut self.states);
            let result = match phase {
                Capability::Init => entry.extension.init(&mut cx, &self.icons),
                Capability::Finish => entry.extension.finish(&mut cx, &self.icons),
                _ => Ok(()),
            };
            if let Err(err) = result {
                error!(
                    "event=phase_failed module=pipeline status=error phase={phase} extension={} error={}",
                    entry.tag, err.message
                );
                return Err(err.into());
            }
        }
        info!(
            "event=phase_done module=pipeline status=ok phase={phase} extensions={} duration_ms={}",
            extensions.with_capability(phase).count(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

/// Outcome of a finished run.
pub struct RunReport {
    icons: Vec<IconRecord>,
    skipped: Vec<IconProcessingError>,
    states: StateStore,
}

impl RunReport {
    /// Icons with every attachment made during the run.
    pub fn icons(&self) -> &[IconRecord] {
        &self.icons
    }

    /// Recoverable failures, in the order they happened.
    pub fn skipped(&self) -> &[IconProcessingError] {
        &self.skipped
    }

    /// Final run state of extension `tag`.
    pub fn state<T: std::any::Any>(&self, tag: &str) -> Option<&T> {
        self.states.get::<T>(tag)
    }
}
