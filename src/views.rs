//! Read-only level views.
//!
//! Each level of the tree is published to the host as an ordered list of
//! `(label, key)` pairs plus an enabled flag, rebuilt after every tree or
//! selection change. Labels are derived from paths; the placeholder key is
//! shown as `--`.

use crate::paths::file_stem;
use crate::resolver::ItemRoot;
use serde::Serialize;

/// Label shown for the placeholder entry of an empty level.
pub const PLACEHOLDER_LABEL: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub label: String,
    pub key: String,
}

/// One dropdown's worth of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelView {
    pub entries: Vec<EntryView>,
    pub enabled: bool,
}

impl LevelView {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(entries: Vec<EntryView>) -> Self {
        Self {
            entries,
            enabled: true,
        }
    }

    /// Number of real entries; a lone placeholder counts as zero, so hosts
    /// can render "Models (0)" headers.
    pub fn count(&self) -> usize {
        match self.entries.first() {
            None => 0,
            Some(first) if first.key.is_empty() => 0,
            _ => self.entries.len(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|e| e.key.as_str())
    }
}

/// Display label for a model path. Models named after the root's base file
/// name are labelled by their distinguishing suffix.
pub fn model_label(path: &str, root: &ItemRoot) -> String {
    if path.is_empty() {
        return PLACEHOLDER_LABEL.to_string();
    }
    let stem = file_stem(path);
    if stem != root.base_name {
        if let Some(suffix) = stem.strip_prefix(root.base_name.as_str()) {
            return suffix.trim_start_matches('_').to_string();
        }
    }
    stem.to_string()
}

pub fn material_label(path: &str) -> String {
    if path.is_empty() {
        return PLACEHOLDER_LABEL.to_string();
    }
    file_stem(path).to_string()
}

/// Texture labels carry the usage slot when the resolver can report one.
pub fn texture_label(path: &str, usage: Option<&str>) -> String {
    if path.is_empty() {
        return PLACEHOLDER_LABEL.to_string();
    }
    let stem = file_stem(path);
    match usage {
        Some(usage) => format!("{usage} - {stem}"),
        None => stem.to_string(),
    }
}

/// Item header line: root base name, optional material-set suffix, and the
/// host-supplied item label.
pub fn display_name(root: &ItemRoot, variant: Option<i32>, item_label: &str) -> String {
    match variant {
        Some(variant) => format!("{} - Material Set {} : {}", root.base_name, variant, item_label),
        None => format!("{} : {}", root.base_name, item_label),
    }
}
