// On-disk identifier cache shared between `generate` and the upload
// commands. It is a flat JSON object of upload path -> identifier, kept in
// insertion order so uploads follow the order the files were configured.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifier::Identifier;

pub const DEFAULT_CACHE_FILE: &str = ".backtrace_cache";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct IdentifierCache {
    entries: IndexMap<PathBuf, Identifier>,
}

impl IdentifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overwrite `path` with the full mapping. Last write wins.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec(self).map_err(|source| Error::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|e| Error::io(path, e))
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, id: Identifier) -> Option<Identifier> {
        self.entries.insert(path.into(), id)
    }

    pub fn get(&self, path: &Path) -> Option<&Identifier> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Identifier)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
