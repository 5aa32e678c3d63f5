//! Icon discovery.

pub mod icon;
pub mod scan;

pub use icon::IconRecord;
pub use scan::{check_unique, IconCatalog, IconFileName, IconScan};

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

/// Catalog scan and consistency errors.
#[derive(Debug)]
pub enum CatalogError {
    MissingDirectory(PathBuf),
    ReadDirectory { path: PathBuf, source: io::Error },
    DuplicateCodePoint {
        code: u32,
        first: PathBuf,
        second: PathBuf,
    },
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDirectory(path) => {
                write!(f, "icons directory {} doesn't exist", path.display())
            }
            Self::ReadDirectory { path, source } => {
                write!(f, "cannot read icons directory {}: {source}", path.display())
            }
            Self::DuplicateCodePoint {
                code,
                first,
                second,
            } => write!(
                f,
                "code point U+{code:04X} used by both {} and {}",
                first.display(),
                second.display()
            ),
            Self::DuplicateName {
                name,
                first,
                second,
            } => write!(
                f,
                "icon name `{name}` used by both {} and {}",
                first.display(),
                second.display()
            ),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadDirectory { source, .. } => Some(source),
            _ => None,
        }
    }
}
