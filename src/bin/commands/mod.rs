// bin/commands/mod.rs

#[cfg(feature = "cli")]
pub mod index;
#[cfg(feature = "cli")]
pub mod search;

use clap::Args;
use rsindex::StoreConfig;

/// Storage engine tuning shared by the subcommands.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Cache size in KiB
    #[arg(short = 'c', long, value_name = "KiB")]
    pub cache_size: Option<usize>,

    /// Memory map the index data when it is at most this many bytes
    #[arg(short = 'm', long, value_name = "BYTES")]
    pub mmap_size: Option<u64>,
}

impl From<StoreArgs> for StoreConfig {
    fn from(args: StoreArgs) -> Self {
        StoreConfig {
            cache_size: args.cache_size,
            mmap_size: args.mmap_size,
        }
    }
}
