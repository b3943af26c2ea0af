// Project configuration. The tool reads the `backtrace.sourcemap` block
// out of a JSON document (usually the project's package.json) and ignores
// everything else in it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub backtrace: BacktraceSection,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BacktraceSection {
    pub sourcemap: SourcemapSection,
}

/// `files` lists the artifacts to identify; `upload` is the symbolication
/// endpoint template. `upload` may be left out when only `generate` is
/// used.
#[derive(Deserialize, Debug, Clone)]
pub struct SourcemapSection {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub upload: Option<String>,
}

/// Either a bare path (hashed and uploaded as-is) or a source/map pair
/// where the identifier comes from the source and the map is uploaded.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FileEntry {
    Path(PathBuf),
    Pair { source: PathBuf, map: PathBuf },
}

/// A resolved file entry: hash `source`, upload `map`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub source: PathBuf,
    pub map: PathBuf,
}

impl From<&FileEntry> for Artifact {
    fn from(entry: &FileEntry) -> Self {
        match entry {
            FileEntry::Path(path) => Artifact {
                source: path.clone(),
                map: path.clone(),
            },
            FileEntry::Pair { source, map } => Artifact {
                source: source.clone(),
                map: map.clone(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| Error::io(path, e))?;
        let config: Config = serde_json::from_slice(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            files = config.backtrace.sourcemap.files.len(),
            "loaded config"
        );
        Ok(config)
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.backtrace
            .sourcemap
            .files
            .iter()
            .map(Artifact::from)
            .collect()
    }

    /// The upload template, preferring an explicit override (CLI flag or
    /// environment) over the config file.
    pub fn upload_url(&self, override_url: Option<&str>) -> Result<String> {
        override_url
            .map(str::to_string)
            .or_else(|| self.backtrace.sourcemap.upload.clone())
            .ok_or(Error::MissingUploadUrl)
    }
}
