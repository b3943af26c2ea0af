// Error kinds surfaced by the library. The binary wraps these in
// `anyhow` so the cause chain is printed on exit.

use std::path::PathBuf;

use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no upload URL configured (set backtrace.sourcemap.upload or --upload-url)")]
    MissingUploadUrl,

    #[error("invalid upload URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to send upload to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload to {url} failed with status {status}")]
    UploadStatus { url: String, status: StatusCode },

    #[error("{failed} of {total} uploads failed")]
    BatchFailed { failed: usize, total: usize },

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
