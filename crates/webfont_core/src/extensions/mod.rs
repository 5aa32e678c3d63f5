//! Built-in extensions.

pub mod colors;
pub mod css;
pub mod css_vars;
pub mod font;
pub mod svg;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::extension::Extension;

/// Leading comment of every generated stylesheet.
pub(crate) const GENERATED_HEADER: &str = "/*
  This file is created automatically by webfont font generator
  WARNING! Don't change this file. Make changes in webfont config file instead
*/";

/// Every statically linked extension.
pub fn builtins() -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(svg::SvgExtension),
        Arc::new(font::FontExtension),
        Arc::new(css::CssExtension),
        Arc::new(css_vars::CssVarsExtension),
        Arc::new(colors::ColorsExtension),
    ]
}

/// Writes a generated text file, creating its folder.
pub(crate) fn write_output(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("cannot create {}: {err}", parent.display()))?;
    }
    fs::write(path, contents).map_err(|err| format!("cannot write {}: {err}", path.display()))
}
