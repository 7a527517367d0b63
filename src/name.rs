use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Case-insensitive identifier used at every catalog boundary.
///
/// Carries both the original spelling (for display) and the folded lowercase
/// spelling (for lookups). Equality, ordering, and hashing all go through the
/// folded form, so `CiStr` can be used directly as a map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiStr {
    /// Original spelling, as the user wrote it.
    pub o: CompactString,
    /// Folded lowercase spelling.
    pub l: CompactString,
}

impl CiStr {
    pub fn new(name: impl AsRef<str>) -> Self {
        let o = CompactString::new(name.as_ref());
        let l = CompactString::new(name.as_ref().to_lowercase());
        Self { o, l }
    }

    pub fn original(&self) -> &str {
        &self.o
    }

    pub fn folded(&self) -> &str {
        &self.l
    }

    pub fn is_empty(&self) -> bool {
        self.o.is_empty()
    }
}

impl PartialEq for CiStr {
    fn eq(&self, other: &Self) -> bool {
        self.l == other.l
    }
}

impl Eq for CiStr {}

impl PartialOrd for CiStr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CiStr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.l.cmp(&other.l)
    }
}

impl Hash for CiStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.l.hash(state);
    }
}

impl fmt::Display for CiStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.o)
    }
}

impl From<&str> for CiStr {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CiStr {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for CiStr {
    /// Borrows the folded form, so maps keyed by `CiStr` can be probed with a
    /// pre-folded `&str`.
    fn borrow(&self) -> &str {
        &self.l
    }
}
