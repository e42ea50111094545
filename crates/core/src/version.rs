//! Object version identifiers
//!
//! Every object carries a `"major.minor"` or `"major.minor.revision"`
//! version label. Compatibility decisions only ever look at the *shape*
//! of a version, the (major, minor) pair. The revision component is a
//! deployment-tracking detail and never participates in version matching.
//!
//! ## Comparison
//!
//! `PartialEq`/`Eq`/`Hash` compare the full label, revision included.
//! Shape comparison is explicit: use [`ObjectVersion::same_shape`] and
//! [`ObjectVersion::shape_cmp`] wherever a compatibility decision is made,
//! so that `"1.6"` and `"1.6.1"` match while `"1.6" != "1.6.1"` as labels.

use crate::error::{Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version label for an object class or wire primitive
///
/// ## Invariants
///
/// - The revision component never participates in shape matching
/// - Registry lookup and backport targeting compare shapes only
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectVersion {
    /// Major version; a major bump breaks wire compatibility
    pub major: u32,
    /// Minor version; bumped on any structural change
    pub minor: u32,
    /// Optional revision, carried through but never matched on
    pub revision: Option<u32>,
}

impl ObjectVersion {
    /// Create a `major.minor` version with no revision
    pub const fn new(major: u32, minor: u32) -> Self {
        ObjectVersion {
            major,
            minor,
            revision: None,
        }
    }

    /// Create a `major.minor.revision` version
    pub const fn with_revision(major: u32, minor: u32, revision: u32) -> Self {
        ObjectVersion {
            major,
            minor,
            revision: Some(revision),
        }
    }

    /// Parse a `"major.minor[.revision]"` label
    pub fn parse(label: &str) -> Result<Self> {
        label.parse()
    }

    /// This version with the revision component stripped
    pub fn without_revision(&self) -> Self {
        ObjectVersion::new(self.major, self.minor)
    }

    /// Whether two versions describe the same wire shape
    ///
    /// Revision differences are ignored: `"1.6"` and `"1.6.1"` are the
    /// same shape.
    pub fn same_shape(&self, other: &ObjectVersion) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    /// Order two versions by shape, ignoring revisions
    pub fn shape_cmp(&self, other: &ObjectVersion) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
    }
}

impl fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(rev) => write!(f, "{}.{}.{}", self.major, self.minor, rev),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

impl FromStr for ObjectVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::VersionParse {
            label: s.to_string(),
        };
        let mut parts = s.split('.');
        let major = parts.next().ok_or_else(bad)?;
        let minor = parts.next().ok_or_else(bad)?;
        let revision = parts.next();
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(ObjectVersion {
            major: major.parse().map_err(|_| bad())?,
            minor: minor.parse().map_err(|_| bad())?,
            revision: match revision {
                Some(rev) => Some(rev.parse().map_err(|_| bad())?),
                None => None,
            },
        })
    }
}

impl Serialize for ObjectVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(D::Error::custom)
    }
}
