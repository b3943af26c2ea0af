// Library root
// ------------
// This crate computes content-derived identifiers for build artifacts,
// records them for later runs, and uploads source maps to a symbolication
// endpoint keyed by those identifiers. The binary (`main.rs`) is a thin
// wrapper around `cli`.
//
// Module responsibilities:
// - `identifier`: MD5-based identifiers formatted as 8-4-4-4-12 hex.
// - `config`: the `backtrace.sourcemap` block of a JSON config file.
// - `cache`: the on-disk path -> identifier mapping (`.backtrace_cache`).
// - `stub`: the generated JavaScript lookup module.
// - `api`: upload URL construction and the blocking HTTP upload client.
// - `pipeline`: generate and upload operations, including batch reporting.
// - `cli`: argument parsing and command dispatch.
pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod identifier;
pub mod pipeline;
pub mod stub;

pub use error::{Error, Result};
pub use identifier::Identifier;
