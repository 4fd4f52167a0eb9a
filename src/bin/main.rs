#[cfg(feature = "cli")]
mod commands;

#[cfg(feature = "cli")]
mod cli {
    use crate::commands::index::{self, IndexArgs};
    use crate::commands::search::{self, SearchArgs};
    use clap::Parser;
    use rsindex::error::RsIndexError;
    use std::io::IsTerminal;
    use tracing::debug;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser)]
    #[command(author, version, about, long_about = None)]
    pub struct Cli {
        /// More diagnostics (-v debug, -vv trace). RUST_LOG takes precedence.
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        /// Worker threads (default: all cores)
        #[arg(long, global = true)]
        threads: Option<usize>,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(clap::Subcommand)]
    enum Commands {
        /// Index a sorted VCF by rsID.
        Index(IndexArgs),
        /// Retrieve VCF records by rsID.
        Search(SearchArgs),
    }

    fn init_logging(verbose: u8) {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .without_time()
            .init();
    }

    pub fn run() -> Result<(), RsIndexError> {
        let cli = Cli::parse();
        init_logging(cli.verbose);

        let threads = cli.threads.unwrap_or_else(num_cpus::get).max(1);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| format!("Failed to set up thread pool: {}", e))?;
        debug!(
            "running {} {} with {} threads",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            threads
        );

        match cli.command {
            Commands::Index(args) => index::run(args),
            Commands::Search(args) => search::run(args),
        }
    }
}

fn main() {
    #[cfg(feature = "cli")]
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI feature not enabled. Please rebuild with --features cli");
        std::process::exit(1);
    }
}
