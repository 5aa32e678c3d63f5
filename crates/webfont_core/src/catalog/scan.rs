//! Icons directory scanning and file-name parsing.
//!
//! # Responsibility
//! - Turn `uni<hex>_<name>[_<tag>[-<tag>...]].svg` files into `IconRecord`s.
//! - Skip every other file silently.
//!
//! # Invariants
//! - Scan order is the file-name order, so repeated scans agree.
//! - Duplicate code points or names are not rejected here; see `check_unique`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{CatalogError, IconRecord};

static ICON_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^uni([0-9a-fA-F]+)_([a-zA-Z][a-zA-Z0-9\-]*)(?:_([a-zA-Z\-]+))?\.svg$")
        .expect("valid icon file regex")
});

/// Identity decoded from one icon file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconFileName {
    pub code: u32,
    pub name: String,
    /// Tags from the file name only, in encoded order.
    pub tags: Vec<String>,
}

impl IconFileName {
    /// Decodes `file_name`; `None` when it does not follow the icon pattern.
    pub fn parse(file_name: &str) -> Option<Self> {
        let captures = ICON_FILE_RE.captures(file_name)?;
        let code = match u32::from_str_radix(&captures[1], 16) {
            Ok(code) => code,
            Err(err) => {
                debug!(
                    "event=icon_skipped module=catalog status=skip file={file_name} reason=code_point error={err}"
                );
                return None;
            }
        };
        let tags = captures
            .get(3)
            .map(|segment| {
                segment
                    .as_str()
                    .split('-')
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            code,
            name: captures[2].to_string(),
            tags,
        })
    }

    /// Encodes back into the file-name pattern.
    pub fn to_file_name(&self) -> String {
        if self.tags.is_empty() {
            format!("uni{:04x}_{}.svg", self.code, self.name)
        } else {
            format!(
                "uni{:04x}_{}_{}.svg",
                self.code,
                self.name,
                self.tags.join("-")
            )
        }
    }
}

/// Directory of icon sources plus the run's default tags.
#[derive(Debug, Clone)]
pub struct IconCatalog {
    dir: PathBuf,
    default_tags: Vec<String>,
}

impl IconCatalog {
    pub fn new<I, S>(dir: impl Into<PathBuf>, default_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dir: dir.into(),
            default_tags: default_tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_tags(&self) -> &[String] {
        &self.default_tags
    }

    /// Starts one pass over the icons directory.
    ///
    /// Records are produced lazily; calling `scan` again restarts from a
    /// fresh directory listing.
    pub fn scan(&self) -> Result<IconScan, CatalogError> {
        if !self.dir.is_dir() {
            return Err(CatalogError::MissingDirectory(self.dir.clone()));
        }
        let read_error = |source| CatalogError::ReadDirectory {
            path: self.dir.clone(),
            source,
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            if entry.file_type().map_err(read_error)?.is_file() {
                entries.push(entry.path());
            }
        }
        entries.sort();
        info!(
            "event=catalog_scan module=catalog status=start dir={} entries={}",
            self.dir.display(),
            entries.len()
        );
        Ok(IconScan {
            entries: entries.into_iter(),
            default_tags: self.default_tags.clone(),
        })
    }

    /// Scans and collects all icons.
    pub fn icons(&self) -> Result<Vec<IconRecord>, CatalogError> {
        Ok(self.scan()?.collect())
    }
}

/// Lazy sequence of icons from one directory listing.
#[derive(Debug)]
pub struct IconScan {
    entries: std::vec::IntoIter<PathBuf>,
    default_tags: Vec<String>,
}

impl Iterator for IconScan {
    type Item = IconRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for path in self.entries.by_ref() {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some(parsed) = IconFileName::parse(file_name) else {
                continue;
            };
            let icon = IconRecord::new(path.clone(), parsed.code, parsed.name)
                .with_tags(self.default_tags.iter().cloned())
                .with_tags(parsed.tags);
            debug!(
                "event=icon_found module=catalog status=ok icon={} code={:#06x} tags={}",
                icon.name,
                icon.code,
                icon.tags.iter().cloned().collect::<Vec<_>>().join(",")
            );
            return Some(icon);
        }
        None
    }
}

/// Rejects catalogs where two icons share a code point or a name.
pub fn check_unique(icons: &[IconRecord]) -> Result<(), CatalogError> {
    let mut codes: HashMap<u32, &Path> = HashMap::new();
    let mut names: HashMap<&str, &Path> = HashMap::new();
    for icon in icons {
        if let Some(first) = codes.insert(icon.code, &icon.file) {
            return Err(CatalogError::DuplicateCodePoint {
                code: icon.code,
                first: first.to_path_buf(),
                second: icon.file.clone(),
            });
        }
        if let Some(first) = names.insert(icon.name.as_str(), &icon.file) {
            return Err(CatalogError::DuplicateName {
                name: icon.name.clone(),
                first: first.to_path_buf(),
                second: icon.file.clone(),
            });
        }
    }
    Ok(())
}
