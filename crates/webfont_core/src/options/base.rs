//! Base options owned by the core rather than by any extension.
//!
//! # Responsibility
//! - Declare location, debug and default-extension options.
//! - Resolve working, icons and output directories to absolute paths.
//!
//! # Invariants
//! - After `normalize`, `work-dir`, `icons-dir` and `output-dir` are absolute.
//! - `normalize` is idempotent.

use std::path::{Path, PathBuf};

use super::paths::{resolve_option, resolve_under};
use super::schema::{split_list, OptionKind, OptionSchema, OptionSpec};
use super::{ConfigError, Configuration, OptionValidationError, OptionValue};

pub const CONFIG: &str = "config";
pub const WORK_DIR: &str = "work-dir";
pub const OUTPUT_DIR: &str = "output-dir";
pub const ICONS_DIR: &str = "icons-dir";
pub const DEBUG: &str = "debug";
pub const EXTENSIONS: &str = "extensions";
pub const LOG_DIR: &str = "log-dir";

/// Default extension tags applied to every icon.
pub const DEFAULT_EXTENSIONS: &str = "svg, font";

/// Options every build accepts, before any extension contributes.
pub fn declare(schema: &mut OptionSchema) -> Result<(), OptionValidationError> {
    schema.group("general options");
    schema.add(
        OptionSpec::new(
            CONFIG,
            OptionKind::Text,
            "config file location (default: search for .webfont.yml in current folder and user home)",
        )
        .short('c'),
    )?;
    schema.add(
        OptionSpec::new(
            WORK_DIR,
            OptionKind::Text,
            "project root path (default: config directory)",
        )
        .short('d')
        .default_text(""),
    )?;
    schema.add(
        OptionSpec::new(
            OUTPUT_DIR,
            OptionKind::Text,
            "output folder relative to work-dir (default: work-dir itself)",
        )
        .short('o')
        .default_text(""),
    )?;
    schema.add(
        OptionSpec::new(
            ICONS_DIR,
            OptionKind::Text,
            "icons path relative to work-dir (default: icons)",
        )
        .short('i')
        .default_text("icons"),
    )?;
    schema.add(
        OptionSpec::new(DEBUG, OptionKind::Flag, "print some debug info (default: False)")
            .short('D'),
    )?;
    schema.add(
        OptionSpec::new(
            EXTENSIONS,
            OptionKind::List,
            "extensions applied to every icon, comma or space separated (default: \"svg, font\")",
        )
        .short('e')
        .default_value(OptionValue::List(split_list(DEFAULT_EXTENSIONS))),
    )?;
    schema.add(OptionSpec::new(
        LOG_DIR,
        OptionKind::Text,
        "also write rotated log files into this folder (default: stderr only)",
    ))?;
    Ok(())
}

/// Resolves base directories and checks that inputs exist.
///
/// Relative `work-dir` values are resolved against the config file's folder,
/// or against `cwd` when no config file was used.
pub fn normalize(config: &mut Configuration, cwd: &Path) -> Result<(), ConfigError> {
    let config_dir = match config.text(CONFIG) {
        Some(file) => resolve_under(cwd, Path::new(file))
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf()),
        None => cwd.to_path_buf(),
    };

    let work_dir = config.text(WORK_DIR).map(PathBuf::from).unwrap_or_default();
    let work_dir = resolve_under(&config_dir, &work_dir);
    config.set(WORK_DIR, OptionValue::text(work_dir.to_string_lossy()));
    resolve_option(config, ICONS_DIR, WORK_DIR)?;
    resolve_option(config, OUTPUT_DIR, WORK_DIR)?;

    if let Some(OptionValue::Text(raw)) = config.get(EXTENSIONS) {
        let tags = split_list(raw);
        config.set(EXTENSIONS, OptionValue::List(tags));
    }
    if config.list(EXTENSIONS).is_empty() {
        return Err(ConfigError::Option(OptionValidationError::Invalid {
            option: EXTENSIONS.to_string(),
            value: String::new(),
            reason: "at least one default extension is required".to_string(),
        }));
    }

    require_dir(config, WORK_DIR, "working")?;
    require_dir(config, ICONS_DIR, "icons")?;
    Ok(())
}

/// Default extension tags after normalization.
pub fn default_tags(config: &Configuration) -> Vec<String> {
    config.list(EXTENSIONS).to_vec()
}

fn require_dir(
    config: &Configuration,
    option: &str,
    role: &'static str,
) -> Result<(), ConfigError> {
    let path = config.require_path(option)?;
    if !path.is_dir() {
        return Err(ConfigError::MissingDirectory { role, path });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{declare, default_tags, normalize, ICONS_DIR, OUTPUT_DIR, WORK_DIR};
    use crate::options::{ConfigError, Configuration, OptionSchema, OptionValue};
    use std::fs;

    fn defaults() -> Configuration {
        let mut schema = OptionSchema::new();
        declare(&mut schema).expect("base options declare");
        let mut config = Configuration::new();
        for spec in schema.specs() {
            config.set(spec.name.clone(), spec.default.clone());
        }
        config
    }

    #[test]
    fn resolves_directories_against_cwd_without_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("icons")).expect("icons dir");
        let mut config = defaults();
        config.set(OUTPUT_DIR, OptionValue::text("dist"));

        normalize(&mut config, dir.path()).expect("normalize");

        let root = dir.path().to_string_lossy().to_string();
        assert_eq!(config.text(WORK_DIR), Some(root.as_str()));
        assert_eq!(
            config.text(ICONS_DIR).map(str::to_string),
            Some(dir.path().join("icons").to_string_lossy().to_string())
        );
        assert_eq!(default_tags(&config), ["svg", "font"]);
    }

    #[test]
    fn normalization_twice_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("icons")).expect("icons dir");
        let mut config = defaults();

        normalize(&mut config, dir.path()).expect("first normalize");
        let first = config.clone();
        normalize(&mut config, dir.path()).expect("second normalize");
        assert_eq!(config, first);
    }

    #[test]
    fn missing_icons_directory_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = defaults();

        let err = normalize(&mut config, dir.path()).expect_err("icons dir is missing");
        assert!(matches!(
            err,
            ConfigError::MissingDirectory { role: "icons", .. }
        ));
    }
}
