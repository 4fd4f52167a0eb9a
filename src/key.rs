// key.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RsIndexError;

/// The conventional marker in front of the digits of an rsID.
pub const RSID_PREFIX: &str = "rs";

/// The numeric part of an rsID, e.g. `182553373` for `rs182553373`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantKey(pub u64);

impl VariantKey {
    pub fn get(self) -> u64 {
        self.0
    }

    /// Parse an identifier from the ID column of the source file.
    ///
    /// Only identifiers carrying the `rs` prefix followed by digits are variant keys;
    /// anything else (`.`, placeholders, other ID namespaces) returns `None`.
    pub fn from_source(id: &str) -> Option<Self> {
        let digits = id.strip_prefix(RSID_PREFIX)?;
        digits.parse().ok().map(VariantKey)
    }

    /// Parse an identifier given in a search request: `rs123`, `123`.
    pub fn from_request(id: &str) -> Result<Self, RsIndexError> {
        let trimmed = id.trim();
        let digits = trimmed.strip_prefix(RSID_PREFIX).unwrap_or(trimmed);
        digits
            .parse()
            .map(VariantKey)
            .map_err(|_| RsIndexError::InvalidIdentifier(id.to_string()))
    }

    /// Key of an identifier listed in a retrieved record.
    ///
    /// The first two characters are dropped without checking that they are `rs`,
    /// so `xx123` reads as key 123.
    pub fn from_record(id: &str) -> Option<Self> {
        id.get(2..)?.parse().ok().map(VariantKey)
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", RSID_PREFIX, self.0)
    }
}

impl FromStr for VariantKey {
    type Err = RsIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariantKey::from_request(s)
    }
}

impl From<u64> for VariantKey {
    fn from(value: u64) -> Self {
        VariantKey(value)
    }
}

/// Anything a search request may be made of: integers, numeric strings, or
/// `rs`-prefixed strings.
pub trait IntoVariantKey {
    fn into_variant_key(self) -> Result<VariantKey, RsIndexError>;
}

impl IntoVariantKey for VariantKey {
    fn into_variant_key(self) -> Result<VariantKey, RsIndexError> {
        Ok(self)
    }
}

impl IntoVariantKey for u64 {
    fn into_variant_key(self) -> Result<VariantKey, RsIndexError> {
        Ok(VariantKey(self))
    }
}

impl IntoVariantKey for u32 {
    fn into_variant_key(self) -> Result<VariantKey, RsIndexError> {
        Ok(VariantKey(self as u64))
    }
}

impl IntoVariantKey for &str {
    fn into_variant_key(self) -> Result<VariantKey, RsIndexError> {
        VariantKey::from_request(self)
    }
}

impl IntoVariantKey for String {
    fn into_variant_key(self) -> Result<VariantKey, RsIndexError> {
        VariantKey::from_request(&self)
    }
}

impl IntoVariantKey for &String {
    fn into_variant_key(self) -> Result<VariantKey, RsIndexError> {
        VariantKey::from_request(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_source_requires_prefix() {
        assert_eq!(VariantKey::from_source("rs182553373"), Some(VariantKey(182553373)));
        assert_eq!(VariantKey::from_source("182553373"), None);
        assert_eq!(VariantKey::from_source("."), None);
        assert_eq!(VariantKey::from_source("rs"), None);
        assert_eq!(VariantKey::from_source("rsBOGUS"), None);
        assert_eq!(VariantKey::from_source("esv3585029"), None);
    }

    #[test]
    fn test_request_forms() {
        let expected = VariantKey(182553373);
        assert_eq!("rs182553373".into_variant_key().unwrap(), expected);
        assert_eq!("182553373".into_variant_key().unwrap(), expected);
        assert_eq!(182553373u64.into_variant_key().unwrap(), expected);
        assert_eq!(182553373u32.into_variant_key().unwrap(), expected);
        assert_eq!(" rs182553373\n".into_variant_key().unwrap(), expected);
        assert_eq!("rs182553373".parse::<VariantKey>().unwrap(), expected);
    }

    #[test]
    fn test_request_rejects_garbage() {
        for bad in ["", "rs", "rsfoo", "chr17:944196", "rs12x"] {
            let err = VariantKey::from_request(bad).unwrap_err();
            assert!(matches!(err, RsIndexError::InvalidIdentifier(_)), "{bad}");
        }
    }

    #[test]
    fn test_record_trims_two_characters() {
        assert_eq!(VariantKey::from_record("rs60995877"), Some(VariantKey(60995877)));
        // the prefix is not checked
        assert_eq!(VariantKey::from_record("xx60995877"), Some(VariantKey(60995877)));
        assert_eq!(VariantKey::from_record("."), None);
        assert_eq!(VariantKey::from_record("rs"), None);
        assert_eq!(VariantKey::from_record("60995877"), Some(VariantKey(995877)));
    }

    #[test]
    fn test_display() {
        assert_eq!(VariantKey(1234497371).to_string(), "rs1234497371");
    }

    proptest! {
        #[test]
        fn request_forms_agree(n in any::<u64>()) {
            let prefixed = VariantKey::from_request(&format!("rs{}", n)).unwrap();
            let bare = VariantKey::from_request(&n.to_string()).unwrap();
            prop_assert_eq!(prefixed, bare);
            prop_assert_eq!(prefixed, n.into_variant_key().unwrap());
        }

        #[test]
        fn displayed_key_round_trips(n in any::<u64>()) {
            let key = VariantKey(n);
            prop_assert_eq!(VariantKey::from_source(&key.to_string()), Some(key));
            prop_assert_eq!(VariantKey::from_record(&key.to_string()), Some(key));
        }
    }
}
