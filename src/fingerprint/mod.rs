//! Cache key derivation.
//!
//! A [`Fingerprint`] is the MD5 digest of an operation's canonical document
//! paired with its variables. Identical (document, variables) pairs always
//! produce identical fingerprints; distinct pairs collide only with digest
//! probability. MD5 is used as a fast, fixed-length key — collision
//! resistance at cache-key strength, not cryptographic strength.

use std::fmt;

use md5::{Digest, Md5};

use crate::operation::Operation;

/// Suffix appended to a fingerprint to form its freshness-marker key.
const MARKER_SUFFIX: &str = ":cache";

/// A 32-character lowercase-hex cache key for one (document, variables) pair.
///
/// # Examples
///
/// ```
/// use swr_link::{Fingerprint, Operation};
///
/// let fingerprint = Fingerprint::of(&Operation::new("{ ping }"));
/// assert_eq!(fingerprint.key().len(), 32);
/// assert_eq!(fingerprint.marker_key(), format!("{}:cache", fingerprint.key()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of an operation.
    ///
    /// The digest input is `canonical_document | variables-json`. Variable
    /// serialization is deterministic: `serde_json::Map` is BTreeMap-backed,
    /// so name order is sorted at every nesting level and insertion order is
    /// irrelevant.
    pub fn of(operation: &Operation) -> Self {
        let canonical = operation.canonical_document();
        let variables = serde_json::to_string(operation.variables()).unwrap(); // string-keyed map, cannot fail

        let mut hasher = Md5::new();
        hasher.update(canonical.as_bytes());
        hasher.update(b"|");
        hasher.update(variables.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Returns the primary cache key: the hex digest itself.
    pub fn key(&self) -> &str {
        &self.0
    }

    /// Returns the freshness-marker key for this fingerprint.
    pub fn marker_key(&self) -> String {
        format!("{}{MARKER_SUFFIX}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
