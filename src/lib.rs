pub mod build;
pub mod error;
pub mod index;
#[cfg(feature = "cli")]
pub mod io;
pub mod key;
pub mod query;
pub mod records;
pub mod retrieve;
pub mod store;

pub mod block;

pub use build::{build, build_index, LogProgress, NoProgress, ProgressSink};
pub use error::RsIndexError;
#[cfg(feature = "cli")]
pub use io::*;
pub use key::{IntoVariantKey, VariantKey};
pub use query::{search, SearchResults};
pub use records::{CoordinateEntry, Region};
pub use retrieve::{RegionSource, RegionStream, Tabix, TabixStream};
pub use store::{prepare_destination, StoreConfig, StoreWriter, VariantStore};

#[cfg(test)]
pub(crate) mod test_utils;
