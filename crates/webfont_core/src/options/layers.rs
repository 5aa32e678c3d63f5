//! Config layers: built-in defaults, YAML config file, command line.
//!
//! # Responsibility
//! - Locate and read the optional `.webfont.yml` config file.
//! - Pre-scan location options before extensions are known.
//! - Merge defaults < config file < command line for a complete schema.
//!
//! # Invariants
//! - Unknown config-file keys and unknown flags are rejected by `resolve`.
//! - Unset command-line flags never shadow config-file values.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use log::{debug, info};

use super::base::CONFIG;
use super::paths::resolve_under;
use super::schema::{OptionKind, OptionSchema};
use super::{ConfigError, Configuration, OptionSource, OptionValidationError, OptionValue};

/// Default config file name searched in the current and home folders.
pub const CONFIG_FILE_NAME: &str = ".webfont.yml";
const COMMAND_NAME: &str = "webfont";
const COMMAND_ABOUT: &str = "Make webfont from SVG icons.";

/// Process-level inputs used to locate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSources {
    pub cwd: PathBuf,
    /// `None` disables the home-folder config lookup.
    pub home: Option<PathBuf>,
}

impl ConfigSources {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            home: None,
        }
    }

    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Current directory and user home of this process.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|err| {
            ConfigError::CommandLine(format!("cannot determine current directory: {err}"))
        })?;
        Ok(Self::new(cwd).with_home(dirs::home_dir()))
    }
}

/// Raw option layers of one invocation, not yet tied to a full schema.
#[derive(Debug, Clone)]
pub struct LayeredOptions {
    args: Vec<OsString>,
    config_file: Option<PathBuf>,
    file_values: BTreeMap<String, serde_yaml::Value>,
    sources: ConfigSources,
}

impl LayeredOptions {
    /// Reads the config file selected by `args` (or found by search).
    ///
    /// `args` includes the program name, as in `std::env::args_os()`.
    pub fn load(
        args: Vec<OsString>,
        sources: ConfigSources,
        base: &OptionSchema,
    ) -> Result<Self, ConfigError> {
        let prescanned = prescan(&args, base);
        let explicit = prescanned.get(CONFIG).map(String::as_str);
        let config_file = locate_config_file(explicit, &sources)?;
        let file_values = match &config_file {
            Some(path) => read_config_file(path)?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            args,
            config_file,
            file_values,
            sources,
        })
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn sources(&self) -> &ConfigSources {
        &self.sources
    }

    /// Whether `-h`/`--help` appears among the arguments.
    pub fn help_requested(&self) -> bool {
        self.args
            .iter()
            .skip(1)
            .any(|arg| arg == "-h" || arg == "--help")
    }

    /// Merges layers for the options `schema` knows, ignoring everything else.
    ///
    /// Used before extensions are resolved, when only base options exist.
    pub fn bootstrap(&self, schema: &OptionSchema) -> Result<Configuration, ConfigError> {
        let mut config = defaults(schema);
        for (key, value) in &self.file_values {
            if let Some(spec) = schema.spec(key) {
                config.set(key.clone(), spec.kind.parse_yaml(key, value)?);
            }
        }
        for (key, raw) in prescan(&self.args, schema) {
            if let Some(spec) = schema.spec(&key) {
                config.set(key.clone(), spec.kind.parse_text(&key, &raw)?);
            }
        }
        self.apply_config_path(&mut config);
        Ok(config)
    }

    /// Merges all layers against the complete schema.
    pub fn resolve(&self, schema: &OptionSchema) -> Result<Configuration, ConfigError> {
        let mut config = defaults(schema);

        for (key, value) in &self.file_values {
            let spec = schema
                .spec(key)
                .ok_or_else(|| OptionValidationError::Unknown {
                    option: key.clone(),
                    source: OptionSource::ConfigFile,
                })?;
            config.set(key.clone(), spec.kind.parse_yaml(key, value)?);
        }

        let matches = schema
            .to_command(COMMAND_NAME, COMMAND_ABOUT)
            .try_get_matches_from(self.args.clone())
            .map_err(command_line_error)?;
        for spec in schema.specs() {
            if matches.value_source(&spec.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            let value = match spec.kind {
                OptionKind::Flag => OptionValue::Bool(matches.get_flag(&spec.name)),
                kind => match matches.get_one::<String>(&spec.name) {
                    Some(raw) => kind.parse_text(&spec.name, raw)?,
                    None => continue,
                },
            };
            config.set(spec.name.clone(), value);
        }

        self.apply_config_path(&mut config);
        debug!(
            "event=options_resolved module=options status=ok options={} config_file={}",
            config.len(),
            self.config_file
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(config)
    }

    /// Renders help text for `schema`.
    pub fn help(&self, schema: &OptionSchema) -> String {
        schema
            .to_command(COMMAND_NAME, COMMAND_ABOUT)
            .render_help()
            .to_string()
    }

    fn apply_config_path(&self, config: &mut Configuration) {
        let value = match &self.config_file {
            Some(path) => OptionValue::text(path.to_string_lossy()),
            None => OptionValue::Null,
        };
        config.set(CONFIG, value);
    }
}

/// Schema defaults as the lowest layer.
pub fn defaults(schema: &OptionSchema) -> Configuration {
    let mut config = Configuration::new();
    for spec in schema.specs() {
        config.set(spec.name.clone(), spec.default.clone());
    }
    config
}

/// Extracts values of options declared in `schema`, skipping anything else.
///
/// Parses with the `clap` command of `schema`. Each argument it rejects is
/// dropped and the rest parsed again; any other parse error keeps what was
/// matched before it.
pub fn prescan(args: &[OsString], schema: &OptionSchema) -> BTreeMap<String, String> {
    let command = schema
        .to_command(COMMAND_NAME, COMMAND_ABOUT)
        .disable_help_flag(true)
        .disable_version_flag(true);
    let mut remaining = args.to_vec();
    let matches = loop {
        let err = match command.clone().try_get_matches_from(remaining.clone()) {
            Ok(matches) => break matches,
            Err(err) => err,
        };
        match rejected_index(&err, &remaining) {
            Some(index) => {
                remaining.remove(index);
            }
            None => match command
                .clone()
                .ignore_errors(true)
                .try_get_matches_from(remaining.clone())
            {
                Ok(matches) => break matches,
                Err(_) => return BTreeMap::new(),
            },
        }
    };

    let mut found = BTreeMap::new();
    for spec in schema.specs() {
        if matches.value_source(&spec.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = match spec.kind {
            OptionKind::Flag => Some(matches.get_flag(&spec.name).to_string()),
            _ => matches.get_one::<String>(&spec.name).cloned(),
        };
        if let Some(value) = value {
            found.insert(spec.name.clone(), value);
        }
    }
    found
}

/// Position in `args` of the argument an unknown-argument error names.
///
/// A rejected short flag inside a cluster such as `-Dx` selects the cluster.
fn rejected_index(err: &clap::Error, args: &[OsString]) -> Option<usize> {
    if err.kind() != ErrorKind::UnknownArgument {
        return None;
    }
    let Some(ContextValue::String(rejected)) = err.get(ContextKind::InvalidArg) else {
        return None;
    };
    let rejected = rejected.split_once('=').map_or(rejected.as_str(), |(name, _)| name);
    let args: Vec<String> = args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let exact = args.iter().enumerate().skip(1).find_map(|(index, arg)| {
        let name = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
        (name == rejected).then_some(index)
    });
    if exact.is_some() {
        return exact;
    }
    let flag = rejected
        .strip_prefix('-')
        .filter(|rest| !rest.starts_with('-'))
        .and_then(|rest| rest.chars().next())?;
    args.iter().enumerate().skip(1).find_map(|(index, arg)| {
        let cluster = arg.strip_prefix('-').filter(|rest| !rest.starts_with('-'))?;
        cluster.contains(flag).then_some(index)
    })
}

/// Finds the config file: explicit path, then `<cwd>/.webfont.yml`, then home.
pub fn locate_config_file(
    explicit: Option<&str>,
    sources: &ConfigSources,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(explicit) = explicit {
        let path = resolve_under(&sources.cwd, Path::new(explicit));
        if !path.is_file() {
            return Err(ConfigError::ConfigFile {
                path,
                reason: "file not found".to_string(),
            });
        }
        return Ok(Some(path));
    }

    let candidates = std::iter::once(sources.cwd.join(CONFIG_FILE_NAME))
        .chain(sources.home.iter().map(|home| home.join(CONFIG_FILE_NAME)));
    for candidate in candidates {
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Reads the `config:` section of a YAML config file.
///
/// A file without a `config` key, or with an empty one, contributes nothing.
pub fn read_config_file(path: &Path) -> Result<BTreeMap<String, serde_yaml::Value>, ConfigError> {
    let file_error = |reason: String| ConfigError::ConfigFile {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|err| file_error(err.to_string()))?;
    let document: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| file_error(err.to_string()))?;

    let section = match &document {
        serde_yaml::Value::Mapping(root) => root.get("config"),
        serde_yaml::Value::Null => None,
        _ => return Err(file_error("top level must be a mapping".to_string())),
    };
    let mut values = BTreeMap::new();
    match section {
        None | Some(serde_yaml::Value::Null) => {}
        Some(serde_yaml::Value::Mapping(entries)) => {
            for (key, value) in entries {
                let key = key
                    .as_str()
                    .ok_or_else(|| file_error(format!("option name must be text: {key:?}")))?;
                values.insert(key.to_string(), value.clone());
            }
        }
        Some(_) => return Err(file_error("`config` must be a mapping".to_string())),
    }

    info!(
        "event=config_file_loaded module=options status=ok path={} options={}",
        path.display(),
        values.len()
    );
    Ok(values)
}

fn command_line_error(err: clap::Error) -> ConfigError {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            ConfigError::DisplayHelp(err.render().to_string())
        }
        ErrorKind::UnknownArgument => match err.get(ContextKind::InvalidArg) {
            Some(ContextValue::String(arg)) => {
                let option = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
                ConfigError::Option(OptionValidationError::Unknown {
                    option: option.trim_start_matches('-').to_string(),
                    source: OptionSource::CommandLine,
                })
            }
            _ => ConfigError::CommandLine(err.render().to_string()),
        },
        _ => ConfigError::CommandLine(err.render().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{locate_config_file, prescan, read_config_file, ConfigSources, LayeredOptions};
    use crate::options::schema::{OptionKind, OptionSchema, OptionSpec};
    use crate::options::{base, ConfigError, OptionSource, OptionValidationError, OptionValue};
    use std::ffi::OsString;
    use std::fs;

    fn args(values: &[&str]) -> Vec<OsString> {
        std::iter::once("webfont")
            .chain(values.iter().copied())
            .map(OsString::from)
            .collect()
    }

    fn base_schema() -> OptionSchema {
        let mut schema = OptionSchema::new();
        base::declare(&mut schema).expect("base options");
        schema
    }

    fn font_schema() -> OptionSchema {
        let mut schema = base_schema();
        schema.group("font generation options");
        schema
            .add(
                OptionSpec::new("font-family", OptionKind::Text, "family")
                    .short('n'),
            )
            .expect("font-family");
        schema
            .add(
                OptionSpec::new("font-weight", OptionKind::Integer, "weight")
                    .short('w')
                    .default_value(OptionValue::Int(500)),
            )
            .expect("font-weight");
        schema
    }

    #[test]
    fn prescan_picks_base_options_and_skips_unknown_ones() {
        let found = prescan(
            &args(&["-n", "Icons", "--work-dir=/w", "-i", "svg", "-D", "--css-class", "x"]),
            &base_schema(),
        );
        assert_eq!(found.get("work-dir").map(String::as_str), Some("/w"));
        assert_eq!(found.get("icons-dir").map(String::as_str), Some("svg"));
        assert_eq!(found.get("debug").map(String::as_str), Some("true"));
        assert!(!found.contains_key("css-class"));
    }

    #[test]
    fn prescan_reads_short_flag_clusters() {
        let found = prescan(
            &args(&["-Di", "glyphs", "-f", "svg", "-d", "my_icons"]),
            &base_schema(),
        );
        assert_eq!(found.get("debug").map(String::as_str), Some("true"));
        assert_eq!(found.get("icons-dir").map(String::as_str), Some("glyphs"));
        assert_eq!(found.get("work-dir").map(String::as_str), Some("my_icons"));
        assert!(!found.contains_key("font-formats"));
    }

    #[test]
    fn prescan_ignores_help_and_unset_options() {
        let found = prescan(&args(&["--help", "-e", "svg font"]), &base_schema());
        assert_eq!(found.get("extensions").map(String::as_str), Some("svg font"));
        assert!(!found.contains_key("debug"));
        assert!(!found.contains_key("work-dir"));
    }

    #[test]
    fn command_line_beats_config_file_beats_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(".webfont.yml"),
            "config:\n  font-family: FromFile\n  font-weight: 300\n",
        )
        .expect("config file");

        let layers = LayeredOptions::load(
            args(&["-n", "FromCli"]),
            ConfigSources::new(dir.path()),
            &base_schema(),
        )
        .expect("load layers");
        let config = layers.resolve(&font_schema()).expect("resolve");

        assert_eq!(config.text("font-family"), Some("FromCli"));
        assert_eq!(config.int("font-weight"), Some(300));
        assert_eq!(config.text("icons-dir"), Some("icons"));
        assert!(config.text("config").is_some());
    }

    #[test]
    fn unknown_config_file_key_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(".webfont.yml"), "config:\n  font-size: 12\n")
            .expect("config file");

        let layers = LayeredOptions::load(args(&[]), ConfigSources::new(dir.path()), &base_schema())
            .expect("load layers");
        let err = layers.resolve(&font_schema()).expect_err("unknown key");
        assert!(matches!(
            err,
            ConfigError::Option(OptionValidationError::Unknown {
                source: OptionSource::ConfigFile,
                ..
            })
        ));
    }

    #[test]
    fn unknown_flag_is_an_option_validation_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layers = LayeredOptions::load(
            args(&["--css-class", "x"]),
            ConfigSources::new(dir.path()),
            &base_schema(),
        )
        .expect("load layers");

        let err = layers.resolve(&font_schema()).expect_err("unknown flag");
        match err {
            ConfigError::Option(OptionValidationError::Unknown { option, source }) => {
                assert_eq!(option, "css-class");
                assert_eq!(source, OptionSource::CommandLine);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bootstrap_ignores_extension_options() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(".webfont.yml"),
            "config:\n  icons-dir: glyphs\n  css-class: ic\n",
        )
        .expect("config file");
        let layers = LayeredOptions::load(
            args(&["-n", "Icons", "-o", "dist"]),
            ConfigSources::new(dir.path()),
            &base_schema(),
        )
        .expect("load layers");

        let config = layers.bootstrap(&base_schema()).expect("bootstrap");
        assert_eq!(config.text("icons-dir"), Some("glyphs"));
        assert_eq!(config.text("output-dir"), Some("dist"));
        assert!(!config.contains("css-class"));
    }

    #[test]
    fn explicit_missing_config_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = locate_config_file(Some("nope.yml"), &ConfigSources::new(dir.path()))
            .expect_err("explicit file must exist");
        assert!(matches!(err, ConfigError::ConfigFile { .. }));
    }

    #[test]
    fn home_config_is_searched_after_cwd() {
        let cwd = tempfile::tempdir().expect("cwd");
        let home = tempfile::tempdir().expect("home");
        fs::write(home.path().join(".webfont.yml"), "config:\n").expect("home config");

        let sources =
            ConfigSources::new(cwd.path()).with_home(Some(home.path().to_path_buf()));
        let found = locate_config_file(None, &sources).expect("search");
        assert_eq!(found, Some(home.path().join(".webfont.yml")));
    }

    #[test]
    fn config_file_without_section_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plain.yml");
        fs::write(&path, "other: 1\n").expect("config file");
        assert!(read_config_file(&path).expect("read").is_empty());
    }
}
