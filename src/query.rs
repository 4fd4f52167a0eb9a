// query.rs

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::error::RsIndexError;
use crate::key::{IntoVariantKey, VariantKey};
use crate::records::{is_header, CoordinateEntry, Region, VariantLine};
use crate::retrieve::{RegionSource, RegionStream};
use crate::store::VariantStore;

/// Look up records by rsID.
///
/// The identifiers are resolved to coordinates through `store`, the matching
/// regions of `source` are fetched with `retriever`, and only lines listing
/// one of the requested identifiers (plus header lines) are kept. Any
/// identifier that cannot be read as an rsID fails the whole request.
///
/// When none of the identifiers is in the store a warning is logged and the
/// returned results are empty.
pub fn search<I, K, S>(
    ids: I,
    store: &VariantStore,
    source: &Path,
    retriever: &S,
    include_header: bool,
) -> Result<SearchResults<S::Stream>, RsIndexError>
where
    I: IntoIterator<Item = K>,
    K: IntoVariantKey,
    S: RegionSource,
{
    let keys = ids
        .into_iter()
        .map(IntoVariantKey::into_variant_key)
        .collect::<Result<FxHashSet<VariantKey>, _>>()?;

    let coordinates = store.get_many(keys.iter().copied())?;
    if coordinates.is_empty() {
        warn!("no rsID matches");
        return Ok(SearchResults {
            stream: None,
            keys,
            emitted: 0,
        });
    }

    let regions = resolve_regions(&coordinates);
    debug!(
        "{} rsIDs resolved to {} regions",
        keys.len(),
        regions.len()
    );
    let stream = retriever.start(source, &regions, include_header)?;

    Ok(SearchResults {
        stream: Some(stream),
        keys,
        emitted: 0,
    })
}

/// One point region per distinct coordinate, ordered by chromosome name and
/// then numerically by position.
pub fn resolve_regions(coordinates: &BTreeSet<CoordinateEntry>) -> Vec<Region> {
    coordinates.iter().map(Region::point).collect()
}

/// Whether a retrieved line belongs in the output: header lines always do,
/// data lines when their ID column lists a requested key.
pub fn line_matches(line: &str, keys: &FxHashSet<VariantKey>) -> Result<bool, RsIndexError> {
    if is_header(line) {
        return Ok(true);
    }
    if line.trim().is_empty() {
        return Ok(false);
    }
    let record = VariantLine::parse(line)
        .ok_or_else(|| RsIndexError::MalformedRecord(line.trim_end().to_string()))?;
    Ok(record
        .identifiers()
        .filter_map(VariantKey::from_record)
        .any(|key| keys.contains(&key)))
}

/// Lazily filtered lines of a retrieval, each exactly as the retriever
/// produced it (line terminator included).
///
/// Lines are read on demand. Dropping the results before the end stops the
/// retrieval.
pub struct SearchResults<S: RegionStream> {
    stream: Option<S>,
    keys: FxHashSet<VariantKey>,
    emitted: u64,
}

impl<S: RegionStream> SearchResults<S> {
    /// Copy all remaining lines to `out`. Returns the number of lines written.
    pub fn write_to<W: Write>(self, out: &mut W) -> Result<u64, RsIndexError> {
        let mut written = 0;
        for line in self {
            out.write_all(line?.as_bytes())?;
            written += 1;
        }
        Ok(written)
    }
}

impl<S: RegionStream> Iterator for SearchResults<S> {
    type Item = Result<String, RsIndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.stream.as_mut()?;
        loop {
            let mut line = String::new();
            match stream.read_line(&mut line) {
                Ok(0) => {
                    let finished = stream.stop();
                    self.stream = None;
                    debug!("{} lines passed the rsID filter", self.emitted);
                    return finished.err().map(Err);
                }
                Ok(_) => match line_matches(&line, &self.keys) {
                    Ok(true) => {
                        self.emitted += 1;
                        return Some(Ok(line));
                    }
                    Ok(false) => continue,
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => {
                    // a failed retriever explains itself better than the read error
                    let stopped = stream.stop();
                    self.stream = None;
                    return Some(Err(stopped.err().unwrap_or_else(|| e.into())));
                }
            }
        }
    }
}

impl<S: RegionStream> Drop for SearchResults<S> {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            let _ = stream.stop();
        }
    }
}
