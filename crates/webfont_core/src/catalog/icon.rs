//! Icon record model.
//!
//! # Responsibility
//! - Carry the identity of one icon source file through the pipeline.
//! - Hold typed per-extension attachments derived while processing.
//!
//! # Invariants
//! - `tags` always starts with the run's default tags, without duplicates.
//! - Each attachment is keyed by the tag of the extension that produced it.
//! - Identity fields (`file`, `code`, `name`, `tags`) never change after scan.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use indexmap::IndexSet;

/// One icon discovered in the icons directory.
pub struct IconRecord {
    /// Source SVG file.
    pub file: PathBuf,
    /// Unicode code point encoded in the file name.
    pub code: u32,
    /// Identifier used for glyph comments and CSS class names.
    pub name: String,
    /// Required extension tags, defaults first.
    pub tags: IndexSet<String>,
    attachments: BTreeMap<String, Box<dyn Any>>,
}

impl IconRecord {
    pub fn new(file: impl Into<PathBuf>, code: u32, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            code,
            name: name.into(),
            tags: IndexSet::new(),
            attachments: BTreeMap::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Whether `tag` is in this icon's dispatch set.
    pub fn requires(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// PostScript-style glyph name, e.g. `uni0041`.
    pub fn glyph_name(&self) -> String {
        format!("uni{:04X}", self.code)
    }

    /// Typed value attached by extension `owner`, if any.
    pub fn attachment<T: Any>(&self, owner: &str) -> Option<&T> {
        self.attachments
            .get(owner)
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn has_attachment(&self, owner: &str) -> bool {
        self.attachments.contains_key(owner)
    }

    /// Crate-internal: extensions go through `IconHandle::attach`.
    pub(crate) fn attach(&mut self, owner: &str, value: Box<dyn Any>) {
        self.attachments.insert(owner.to_string(), value);
    }
}

impl PartialEq for IconRecord {
    /// Identity comparison; attachments are derived state and not compared.
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file
            && self.code == other.code
            && self.name == other.name
            && self.tags == other.tags
    }
}

impl Debug for IconRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconRecord")
            .field("file", &self.file)
            .field("code", &format_args!("{:#06x}", self.code))
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("attachments", &self.attachments.keys().collect::<Vec<_>>())
            .finish()
    }
}
