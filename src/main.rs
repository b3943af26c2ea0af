// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, hand off to `cli::run`.
// - Usage errors exit with status 1; runtime errors bubble up as `anyhow`
//   errors, which also exit with status 1.

use backtrace_sourcemap::cli::{self, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose, cli.quiet);
    cli::run(cli)
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    // RUST_LOG, when set, takes precedence over -v/-q.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("backtrace_sourcemap={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
