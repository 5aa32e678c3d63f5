//! One webfont build from raw arguments to a finished run.
//!
//! Option parsing needs every extension's declarations, while the set of
//! extensions depends on the icons directory named by those options. The
//! build therefore bootstraps the base options first, scans the catalog,
//! resolves extensions, and only then parses the full command line.

use std::ffi::OsString;
use std::time::Instant;

use log::info;

use super::runner::{PipelineRunner, RunReport};
use crate::catalog::{check_unique, IconCatalog, IconRecord};
use crate::error::WebfontResult;
use crate::extension::{required_tags, ExtensionRegistry, ResolvedExtensions, LOCAL_EXTENSIONS_DIR};
use crate::options::aggregate::declare_all;
use crate::options::{base, ConfigError, ConfigSources, Configuration, LayeredOptions, OptionSchema, OptionsAggregator};

/// Entry point for a build.
pub struct WebfontBuild;

impl WebfontBuild {
    /// Parses options, scans icons and resolves extensions.
    ///
    /// `args` includes the program name. A help request surfaces as
    /// `ConfigError::DisplayHelp` carrying the rendered text.
    pub fn prepare(args: Vec<OsString>, sources: ConfigSources) -> WebfontResult<PreparedBuild> {
        Self::prepare_with(ExtensionRegistry::with_builtins(), args, sources)
    }

    /// Same as [`WebfontBuild::prepare`] with a caller-supplied registry.
    ///
    /// The registry's local manifest folder is replaced by the one under the
    /// resolved working directory.
    pub fn prepare_with(
        registry: ExtensionRegistry,
        args: Vec<OsString>,
        sources: ConfigSources,
    ) -> WebfontResult<PreparedBuild> {
        let started_at = Instant::now();
        let mut base_schema = OptionSchema::new();
        base::declare(&mut base_schema)?;
        let layers = LayeredOptions::load(args, sources, &base_schema)?;

        if layers.help_requested() {
            let schema = declare_all(registry.builtins().map(|extension| extension.as_ref()))?;
            return Err(ConfigError::DisplayHelp(layers.help(&schema)).into());
        }

        let cwd = layers.sources().cwd.clone();
        let mut bootstrap = layers.bootstrap(&base_schema)?;
        base::normalize(&mut bootstrap, &cwd)?;

        let catalog = IconCatalog::new(
            bootstrap.require_path(base::ICONS_DIR)?,
            base::default_tags(&bootstrap),
        );
        let icons = catalog.icons()?;
        check_unique(&icons)?;

        let work_dir = bootstrap.require_path(base::WORK_DIR)?;
        let registry = registry.with_local_dir(work_dir.join(LOCAL_EXTENSIONS_DIR));
        let extensions = registry.resolve(required_tags(catalog.default_tags(), &icons))?;

        let aggregator = OptionsAggregator::new(&extensions);
        let schema = aggregator.schema()?;
        let mut config = layers.resolve(&schema)?;
        aggregator.normalize(&mut config, &cwd)?;

        info!(
            "event=build_prepared module=pipeline status=ok icons={} extensions={} duration_ms={}",
            icons.len(),
            extensions.len(),
            started_at.elapsed().as_millis()
        );
        Ok(PreparedBuild {
            config,
            icons,
            extensions,
        })
    }
}

/// Everything a run needs, validated and frozen.
pub struct PreparedBuild {
    config: Configuration,
    icons: Vec<IconRecord>,
    extensions: ResolvedExtensions,
}

impl PreparedBuild {
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn icons(&self) -> &[IconRecord] {
        &self.icons
    }

    pub fn extensions(&self) -> &ResolvedExtensions {
        &self.extensions
    }

    /// Runs init, per-icon processing and finish.
    pub fn run(self) -> WebfontResult<RunReport> {
        let Self {
            config,
            icons,
            extensions,
        } = self;
        PipelineRunner::new(&config, &extensions, icons).run()
    }
}
