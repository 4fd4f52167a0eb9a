// bin/commands/search.rs

use crate::commands::StoreArgs;
use clap::Args;
use rsindex::error::RsIndexError;
use rsindex::io::{read_identifiers, OutputStream};
use rsindex::{search, Tabix, VariantStore};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Args)]
pub struct SearchArgs {
    /// The indexed VCF, bgzip compressed with a tabix index beside it
    #[arg(value_name = "input.vcf.gz")]
    pub vcf: PathBuf,

    /// Index built with `rsidx index`
    #[arg(value_name = "input.rsidx")]
    pub index: PathBuf,

    /// rsIDs to look up, with or without the rs prefix
    #[arg(value_name = "RSID", required_unless_present = "rsid_file")]
    pub rsids: Vec<String>,

    /// File with one rsID per line
    #[arg(long, value_name = "rsids.txt")]
    pub rsid_file: Option<PathBuf>,

    /// Include the VCF header in the output
    #[arg(long)]
    pub header: bool,

    /// Output file (default: standard output). A .gz suffix compresses it.
    #[arg(short, long, value_name = "hits.vcf")]
    pub out: Option<PathBuf>,

    /// tabix executable used for region retrieval
    #[arg(long, value_name = "PROGRAM", default_value = "tabix")]
    pub tabix: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn run(args: SearchArgs) -> Result<(), RsIndexError> {
    let start = Instant::now();

    let mut rsids = args.rsids;
    if let Some(path) = &args.rsid_file {
        rsids.extend(read_identifiers(path)?);
    }
    debug!("searching {} for {} rsIDs", args.vcf.display(), rsids.len());

    let store = VariantStore::open_with(&args.index, args.store.into())?;
    let tabix = Tabix::new(args.tabix);
    let results = search(&rsids, &store, &args.vcf, &tabix, args.header)?;

    let output_stream = OutputStream::new(args.out.as_ref());
    let mut output_writer = output_stream.writer()?;
    let written = results.write_to(&mut output_writer)?;
    output_writer.flush()?;

    info!("{} lines written in {:?}", written, start.elapsed());
    Ok(())
}
