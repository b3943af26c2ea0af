// The operations behind each command: compute identifiers and persist
// them, then upload source maps one at a time.
//
// Uploads never stop at the first failure. Every job is attempted, each
// outcome lands in an `UploadReport`, and the report turns into an error
// afterwards if anything failed.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indicatif::ProgressBar;

use crate::api::UploadClient;
use crate::cache::IdentifierCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::identifier::Identifier;
use crate::stub::write_stub;

const MAP_EXTENSION: &str = ".map";

/// Hash every configured artifact in order. After each one, the cache
/// (upload path -> id) and the runtime stub (source path -> id) are both
/// rewritten in full. The first unreadable source aborts the run.
pub fn generate(config: &Config, dest: &Path, cache_path: &Path) -> Result<IdentifierCache> {
    let mut cache = IdentifierCache::new();
    let mut chunks: IndexMap<String, Identifier> = IndexMap::new();

    for artifact in config.artifacts() {
        let id = Identifier::for_file(&artifact.source)?;
        tracing::info!("{} -> {id}", artifact.source.display());

        chunks.insert(artifact.source.display().to_string(), id.clone());
        cache.insert(artifact.map, id);

        cache.save(cache_path)?;
        tracing::info!("Writing UUIDs to {}", dest.display());
        write_stub(dest, &chunks)?;
    }

    Ok(cache)
}

/// Where a job's identifier comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// Already known, e.g. read from the cache file.
    Known(Identifier),
    /// Derived by hashing another file when the job runs.
    HashOf(PathBuf),
}

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub path: PathBuf,
    pub id: IdSource,
}

impl UploadJob {
    fn resolve_id(&self) -> Result<Identifier> {
        match &self.id {
            IdSource::Known(id) => Ok(id.clone()),
            IdSource::HashOf(source) => Identifier::for_file(source),
        }
    }
}

/// Jobs for every cache entry, in cache order.
pub fn cached_jobs(cache: &IdentifierCache) -> Vec<UploadJob> {
    cache
        .iter()
        .map(|(path, id)| UploadJob {
            path: path.clone(),
            id: IdSource::Known(id.clone()),
        })
        .collect()
}

/// Jobs for every `*.map` file directly inside `dir`, sorted by name. Each
/// map's identifier is the hash of the sibling file without `.map`.
pub fn directory_jobs(dir: &Path) -> Result<Vec<UploadJob>> {
    let mut jobs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::warn!("skipping non UTF-8 file name {:?}", entry.path());
            continue;
        };
        let Some(source_name) = name.strip_suffix(MAP_EXTENSION) else {
            continue;
        };
        if source_name.is_empty() {
            continue;
        }
        jobs.push(UploadJob {
            path: dir.join(name),
            id: IdSource::HashOf(dir.join(source_name)),
        });
    }
    jobs.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(dir = %dir.display(), maps = jobs.len(), "scanned for source maps");
    Ok(jobs)
}

/// Outcome of a batch of uploads.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<(PathBuf, Identifier)>,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl UploadReport {
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// `Error::BatchFailed` if any job failed, otherwise the report.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::BatchFailed {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

/// Upload each job in order. Failures are logged and recorded; they do not
/// stop the remaining jobs.
pub fn run_uploads(
    client: &UploadClient,
    jobs: &[UploadJob],
    progress: &ProgressBar,
) -> UploadReport {
    let mut report = UploadReport::default();
    progress.set_length(jobs.len() as u64);

    for job in jobs {
        progress.set_message(job.path.display().to_string());
        let outcome = job.resolve_id().and_then(|id| {
            progress.suspend(|| client.upload(&job.path, &id))?;
            Ok(id)
        });
        match outcome {
            Ok(id) => report.uploaded.push((job.path.clone(), id)),
            Err(err) => {
                let err = anyhow::Error::new(err);
                progress.suspend(|| {
                    tracing::error!("Failed to upload {}: {err:#}", job.path.display());
                });
                report.failed.push((job.path.clone(), err));
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    report
}

/// Upload every entry of the cache file at `cache_path`.
pub fn upload_cached(
    client: &UploadClient,
    cache_path: &Path,
    progress: &ProgressBar,
) -> Result<UploadReport> {
    let cache = IdentifierCache::load(cache_path)?;
    if cache.is_empty() {
        tracing::warn!("{} lists no files to upload", cache_path.display());
    }
    tracing::info!("Uploading Source Maps...");
    run_uploads(client, &cached_jobs(&cache), progress).into_result()
}

/// Upload every source map in `dir`, deriving identifiers on the fly.
pub fn upload_generate(
    client: &UploadClient,
    dir: &Path,
    progress: &ProgressBar,
) -> Result<UploadReport> {
    let jobs = directory_jobs(dir)?;
    run_uploads(client, &jobs, progress).into_result()
}

/// Prefer identifiers from a previous `generate`; fall back to scanning
/// `dir` when no cache file exists.
pub fn upload(
    client: &UploadClient,
    dir: &Path,
    cache_path: &Path,
    progress: &ProgressBar,
) -> Result<UploadReport> {
    if cache_path.exists() {
        tracing::debug!(cache = %cache_path.display(), "using cached identifiers");
        upload_cached(client, cache_path, progress)
    } else {
        upload_generate(client, dir, progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(files: &[&str]) -> Config {
        let json = serde_json::json!({
            "backtrace": { "sourcemap": { "files": files, "upload": "https://x/y?" } }
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn generate_writes_cache_and_stub() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, b"").unwrap();
        let dest = dir.path().join("uuids.js");
        let cache_path = dir.path().join(".backtrace_cache");

        let cache = generate(&config_for(&[a.to_str().unwrap()]), &dest, &cache_path).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(IdentifierCache::load(&cache_path).unwrap(), cache);
        let stub = fs::read_to_string(&dest).unwrap();
        assert!(stub.contains("d41d8cd9-8f00-b204-e980-0998ecf8427e"));
    }

    #[test]
    fn generate_keys_pairs_by_map_and_hashes_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("b.js");
        let map = dir.path().join("b.js.map");
        fs::write(&source, "let b = 1;").unwrap();
        fs::write(&map, "{}").unwrap();
        let json = serde_json::json!({
            "backtrace": { "sourcemap": { "files": [{ "source": source, "map": map }] } }
        });
        let config: Config = serde_json::from_value(json).unwrap();

        let cache = generate(
            &config,
            &dir.path().join("uuids.js"),
            &dir.path().join(".backtrace_cache"),
        )
        .unwrap();

        assert_eq!(
            cache.get(&map),
            Some(&Identifier::from_bytes(b"let b = 1;"))
        );
        assert!(cache.get(&source).is_none());
    }

    #[test]
    fn generate_stops_at_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.js");

        let err = generate(
            &config_for(&[missing.to_str().unwrap()]),
            &dir.path().join("uuids.js"),
            &dir.path().join(".backtrace_cache"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn directory_jobs_pair_maps_with_sources() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["app.js", "app.js.map", "vendor.js.map", "readme.txt", ".map"] {
            fs::write(dir.path().join(name), name).unwrap();
        }

        let jobs = directory_jobs(dir.path()).unwrap();
        assert_eq!(
            jobs,
            vec![
                UploadJob {
                    path: dir.path().join("app.js.map"),
                    id: IdSource::HashOf(dir.path().join("app.js")),
                },
                UploadJob {
                    path: dir.path().join("vendor.js.map"),
                    id: IdSource::HashOf(dir.path().join("vendor.js")),
                },
            ]
        );
    }

    #[test]
    fn report_with_failures_becomes_batch_error() {
        let mut report = UploadReport::default();
        report
            .uploaded
            .push(("a.js.map".into(), Identifier::from_bytes(b"a")));
        report
            .failed
            .push(("b.js.map".into(), Error::MissingUploadUrl.into()));

        match report.into_result() {
            Err(Error::BatchFailed { failed, total }) => {
                assert_eq!((failed, total), (1, 2));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
