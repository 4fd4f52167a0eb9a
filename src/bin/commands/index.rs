// bin/commands/index.rs

use crate::commands::StoreArgs;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rsindex::error::RsIndexError;
use rsindex::io::InputStream;
use rsindex::{build_index, prepare_destination, LogProgress};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Args)]
pub struct IndexArgs {
    /// Sorted VCF to index (plain, gzip or bgzip), or - for standard input
    #[arg(value_name = "input.vcf.gz")]
    pub vcf: PathBuf,

    /// Index to create
    #[arg(value_name = "input.rsidx")]
    pub index: PathBuf,

    /// Overwrite the index if it exists
    #[arg(short = 'f', long)]
    pub force: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn run(args: IndexArgs) -> Result<(), RsIndexError> {
    let start = Instant::now();

    prepare_destination(&args.index, args.force)?;
    info!(
        "indexing {} into {}",
        args.vcf.display(),
        args.index.display()
    );

    let reader = InputStream::new(&args.vcf).reader()?;
    let config = args.store.into();

    // the spinner is only drawn on a terminal; elsewhere progress goes to the log
    let written = if std::io::stderr().is_terminal() {
        let pb = ProgressBar::new_spinner().with_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        let mut progress = |lines: u64| pb.set_message(format!("{} variants", lines));
        let written = build_index(reader, &args.index, config, &mut progress)?;
        pb.finish_and_clear();
        written
    } else {
        build_index(reader, &args.index, config, &mut LogProgress)?
    };

    info!("indexed {} rsIDs in {:?}", written, start.elapsed());
    Ok(())
}
