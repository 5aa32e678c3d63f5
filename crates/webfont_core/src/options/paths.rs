//! Idempotent path resolution for output locations.

use std::path::{Component, Path, PathBuf};

use super::{Configuration, OptionValidationError, OptionValue};

/// Resolves `path` against `root`.
///
/// Absolute inputs are returned unchanged (only lexically cleaned), so a
/// second normalization pass over already-resolved values is a no-op.
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return clean(path);
    }
    clean(&root.join(path))
}

/// Resolves text option `option` against the text option `root`, in place.
///
/// A null option resolves to the root itself.
pub fn resolve_option(
    config: &mut Configuration,
    option: &str,
    root: &str,
) -> Result<(), OptionValidationError> {
    let root = config.require_path(root)?;
    let relative = config.text(option).map(PathBuf::from).unwrap_or_default();
    let resolved = resolve_under(&root, &relative);
    config.set(option, OptionValue::text(resolved.to_string_lossy()));
    Ok(())
}

/// Drops `.` components and folds `..` where a parent exists.
fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::{resolve_option, resolve_under};
    use crate::options::{Configuration, OptionValue};
    use std::path::{Path, PathBuf};

    #[test]
    fn empty_path_resolves_to_root() {
        assert_eq!(
            resolve_under(Path::new("/work"), Path::new("")),
            PathBuf::from("/work")
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = resolve_under(Path::new("/work"), Path::new("./out/fonts"));
        let twice = resolve_under(Path::new("/work"), &once);
        assert_eq!(once, PathBuf::from("/work/out/fonts"));
        assert_eq!(once, twice);
    }

    #[test]
    fn parent_components_are_folded() {
        assert_eq!(
            resolve_under(Path::new("/work/site"), Path::new("../fonts")),
            PathBuf::from("/work/fonts")
        );
    }

    #[test]
    fn resolve_option_fills_null_with_root() {
        let mut config = Configuration::new();
        config.set("output-dir", OptionValue::text("/work/dist"));
        config.set("font-output", OptionValue::Null);

        resolve_option(&mut config, "font-output", "output-dir").expect("resolve font-output");
        assert_eq!(config.text("font-output"), Some("/work/dist"));
    }
}
