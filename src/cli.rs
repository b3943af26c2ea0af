// Command-line surface: one command enum, parsed with clap, dispatched to
// the pipeline operations. The binary (`main.rs`) only parses, sets up
// logging and calls `run`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::api::UploadClient;
use crate::cache::DEFAULT_CACHE_FILE;
use crate::config::Config;
use crate::pipeline::{self, UploadReport};

pub const UPLOAD_URL_ENV: &str = "BACKTRACE_SOURCEMAP_UPLOAD_URL";

#[derive(Parser, Debug)]
#[command(name = "backtrace-sourcemap")]
#[command(about = "Compute content identifiers for build artifacts and upload their source maps")]
#[command(version, arg_required_else_help = true, disable_help_subcommand = true)]
pub struct Cli {
    /// Identifier cache shared between `generate` and `upload`
    #[arg(long, global = true, default_value = DEFAULT_CACHE_FILE)]
    pub cache: PathBuf,

    /// Upload URL template (overrides backtrace.sourcemap.upload)
    #[arg(long, global = true, env = UPLOAD_URL_ENV)]
    pub upload_url: Option<String>,

    /// Increase logging (-vv reaches trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Hash configured files, write the identifier cache and the runtime stub
    #[command(alias = "generate-uuids")]
    Generate {
        /// JSON config with a backtrace.sourcemap block
        config: PathBuf,
        /// Where to write the generated lookup module
        dest: PathBuf,
    },
    /// Upload using the cache if present, otherwise scan DIR for source maps
    Upload {
        #[arg(default_value = "package.json")]
        config: PathBuf,
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Upload every file listed in a cache file
    UploadCached { cache: PathBuf, config: PathBuf },
    /// Upload each *.map in DIR, identified by the hash of its sibling source
    #[command(alias = "upload-sourcemaps")]
    UploadGenerate { config: PathBuf, dir: PathBuf },
}

pub fn run(cli: Cli) -> Result<()> {
    let override_url = cli.upload_url.as_deref();

    match &cli.command {
        Command::Generate { config, dest } => {
            let config = load_config(config)?;
            let cache = pipeline::generate(&config, dest, &cli.cache)?;
            if !cli.quiet {
                println!(
                    "Generated {} identifier(s) into {}",
                    cache.len(),
                    cli.cache.display()
                );
            }
        }
        Command::Upload { config, dir } => {
            let client = upload_client(config, override_url)?;
            let report = pipeline::upload(&client, dir, &cli.cache, &progress_bar(cli.quiet)?)?;
            summarize(&report, cli.quiet);
        }
        Command::UploadCached { cache, config } => {
            let client = upload_client(config, override_url)?;
            let report = pipeline::upload_cached(&client, cache, &progress_bar(cli.quiet)?)?;
            summarize(&report, cli.quiet);
        }
        Command::UploadGenerate { config, dir } => {
            let client = upload_client(config, override_url)?;
            let report = pipeline::upload_generate(&client, dir, &progress_bar(cli.quiet)?)?;
            summarize(&report, cli.quiet);
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

fn upload_client(config: &Path, override_url: Option<&str>) -> Result<UploadClient> {
    let config = load_config(config)?;
    let template = config.upload_url(override_url)?;
    Ok(UploadClient::new(template)?)
}

/// Progress for batch uploads; indicatif hides it on non-terminals.
fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    bar.set_style(ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")?);
    Ok(bar)
}

fn summarize(report: &UploadReport, quiet: bool) {
    if !quiet {
        println!("Uploaded {} source map(s)", report.uploaded.len());
    }
}
