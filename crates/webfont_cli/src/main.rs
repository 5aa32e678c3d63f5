//! `webfont` command.
//!
//! # Responsibility
//! - Start logging from the location options, then run one build.
//! - Map outcomes to exit codes: 0 on success (skipped icons included),
//!   1 on any fatal error.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info, warn};
use webfont_core::options::base::{self, DEBUG, LOG_DIR};
use webfont_core::options::layers::prescan;
use webfont_core::{
    core_version, init_logging, log_level, logging_status, ConfigSources, OptionSchema,
    WebfontBuild, WebfontError,
};

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();
    start_logging(&args);

    let result = ConfigSources::from_env()
        .map_err(WebfontError::from)
        .and_then(|sources| WebfontBuild::prepare(args, sources))
        .and_then(|build| build.run());

    match result {
        Ok(report) => {
            for skipped in report.skipped() {
                warn!("{skipped}");
            }
            info!(
                "event=build_done module=cli status=ok icons={} skipped={}",
                report.icons().len(),
                report.skipped().len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            if let Some(help) = err.help_text() {
                println!("{help}");
                return ExitCode::SUCCESS;
            }
            error!("event=build_failed module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging(args: &[OsString]) {
    let mut schema = OptionSchema::new();
    if base::declare(&mut schema).is_err() {
        return;
    }
    let found = prescan(args, &schema);
    let debug = found
        .get(DEBUG)
        .map(|value| value != "false")
        .unwrap_or(false);
    let log_dir = found.get(LOG_DIR).map(PathBuf::from);
    if let Err(err) = init_logging(log_level(debug), log_dir.as_deref()) {
        eprintln!("warning: logging disabled: {err}");
        return;
    }
    if let Some((level, log_dir)) = logging_status() {
        info!(
            "event=cli_start module=cli status=ok version={} level={level} log_dir={}",
            core_version(),
            log_dir
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "stderr".to_string())
        );
    }
}
