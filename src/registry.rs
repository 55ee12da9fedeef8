//! Built-in catalog of SeemoRe model variants and name lookup.
//!
//! Six pretrained variants exist: two size classes (`base`, `tiny`),
//! each exported at x2/x3/x4 scale. The catalog is a plain immutable
//! lookup table; resolving a name performs no I/O.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CHECKPOINT_URL_BASE: &str =
    "https://huggingface.co/eduardzamfir/seemore-onnx/resolve/main";

/// Recognized model names, case-sensitive.
pub const MODEL_NAMES: [&str; 6] = [
    "seemore_b_x2",
    "seemore_b_x3",
    "seemore_b_x4",
    "seemore_t_x2",
    "seemore_t_x3",
    "seemore_t_x4",
];

/// Architecture size class: capacity/speed trade-off of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    Base,
    Tiny,
}

impl SizeClass {
    fn short_code(self) -> &'static str {
        match self {
            Self::Base => "b",
            Self::Tiny => "t",
        }
    }
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Tiny => write!(f, "tiny"),
        }
    }
}

/// Immutable descriptor of one pretrained model variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    /// Upscale factor (2, 3, or 4).
    pub scale: u32,
    pub size_class: SizeClass,
    /// Checkpoint filename inside the cache directory.
    pub filename: String,
    pub url: Option<String>,
    pub sha256: Option<String>,
}

fn builtin_entries() -> Vec<ModelEntry> {
    let mut entries = Vec::with_capacity(6);
    for size_class in [SizeClass::Base, SizeClass::Tiny] {
        for scale in [2u32, 3, 4] {
            let name = format!("seemore_{}_x{}", size_class.short_code(), scale);
            let filename = format!("{name}.onnx");
            let url = format!("{CHECKPOINT_URL_BASE}/{filename}");
            entries.push(ModelEntry {
                name,
                scale,
                size_class,
                filename,
                url: Some(url),
                sha256: None,
            });
        }
    }
    entries
}

/// Resolve a model name to its descriptor.
///
/// Pure lookup against the built-in catalog; fails with
/// [`Error::UnknownModel`] before any filesystem or network access.
pub fn lookup(name: &str) -> Result<ModelEntry> {
    builtin_entries()
        .into_iter()
        .find(|e| e.name == name)
        .ok_or_else(|| Error::UnknownModel {
            name: name.to_string(),
            available: MODEL_NAMES.join(", "),
        })
}

/// Catalog of known model variants.
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
}

impl ModelCatalog {
    /// Catalog holding the six built-in SeemoRe variants.
    pub fn builtin() -> Self {
        Self {
            entries: builtin_entries(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn list(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn list_by_size_class(&self, size_class: SizeClass) -> Vec<&ModelEntry> {
        self.entries
            .iter()
            .filter(|e| e.size_class == size_class)
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Merge entries from a JSON catalog, skipping names already present.
    pub fn load_json(&mut self, json: &str) -> serde_json::Result<()> {
        let loaded: Vec<ModelEntry> = serde_json::from_str(json)?;
        for entry in loaded {
            if !self.entries.iter().any(|e| e.name == entry.name) {
                self.entries.push(entry);
            }
        }
        Ok(())
    }
}
