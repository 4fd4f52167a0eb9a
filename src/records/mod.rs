// records/mod.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RsIndexError;

/// Lines starting with this are headers/comments in the source file.
pub const COMMENT_CHAR: char = '#';

/// Field separator for identifier lists in the ID column.
pub const ID_SEPARATOR: char = ';';

/// Where a variant sits: chromosome label and position, both verbatim from
/// the source file.
///
/// Ordering is lexicographic on the chromosome and numeric on the position,
/// the order regions are handed to the range retrieval tool.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoordinateEntry {
    pub chrom: String,
    pub position: u64,
}

impl CoordinateEntry {
    pub fn new(chrom: impl Into<String>, position: u64) -> Self {
        Self {
            chrom: chrom.into(),
            position,
        }
    }
}

/// A `chrom:start-end` region, inclusive on both ends like tabix's region
/// argument.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    /// The single-point region of a coordinate.
    pub fn point(entry: &CoordinateEntry) -> Self {
        Self {
            chrom: entry.chrom.clone(),
            start: entry.position,
            end: entry.position,
        }
    }

    pub fn contains(&self, chrom: &str, position: u64) -> bool {
        self.chrom == chrom && self.start <= position && position <= self.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

impl FromStr for Region {
    type Err = RsIndexError;

    fn from_str(region: &str) -> Result<Self, Self::Err> {
        // contig names may contain ':' (e.g. HLA alleles), so split on the last one
        let (chrom, coords) = region
            .rsplit_once(':')
            .ok_or("Invalid region format. Expected seqname:start-end.")?;
        let (start, end) = coords
            .split_once('-')
            .ok_or("Invalid region format. Expected start-end.")?;

        let start: u64 = start.parse().map_err(|_| "Invalid start coordinate.")?;
        let end: u64 = end.parse().map_err(|_| "Invalid end coordinate.")?;
        if chrom.is_empty() || end < start {
            return Err(format!("Invalid region {}", region).into());
        }

        Ok(Self {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

/// Borrowed view of the first three columns of a data line.
#[derive(Debug, PartialEq)]
pub struct VariantLine<'a> {
    pub chrom: &'a str,
    pub position: &'a str,
    pub ids: &'a str,
}

impl<'a> VariantLine<'a> {
    /// Split a data line; `None` if it has fewer than three tab-separated fields.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut fields = line.splitn(4, '\t');
        let chrom = fields.next()?;
        let position = fields.next()?;
        let ids = fields.next()?;
        Some(Self {
            chrom,
            position,
            ids,
        })
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'a str> {
        self.ids.split(ID_SEPARATOR)
    }
}

pub fn is_header(line: &str) -> bool {
    line.starts_with(COMMENT_CHAR)
}
