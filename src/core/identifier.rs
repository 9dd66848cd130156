//! Hashed state identifiers.
//!
//! States are keyed by a stable integer hash of their human-readable name.
//! The name is kept alongside the hash for diagnostics only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Integer key under which a state is registered in its machine.
pub type StateHash = i32;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// A `(name, hash)` pair identifying a state within a machine.
///
/// Equality and hashing only consider `hash`: two identifiers with different
/// names but the same hash are the same key. A machine reports such a pair as
/// a duplicate because it cannot tell a repeated name from a collision.
///
/// # Example
///
/// ```rust
/// use statetree::core::HashedId;
///
/// let idle = HashedId::new("Idle");
/// assert_eq!(idle.hash, HashedId::hash_of("Idle"));
/// assert_eq!(idle, HashedId::with_hash("Renamed", idle.hash));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HashedId {
    /// Human-readable state name
    pub name: String,
    /// Stable hash of `name`, or an explicitly supplied key
    pub hash: StateHash,
}

impl HashedId {
    /// Create an identifier whose hash is derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = Self::hash_of(&name);
        Self { name, hash }
    }

    /// Create an identifier with an explicit hash.
    pub fn with_hash(name: impl Into<String>, hash: StateHash) -> Self {
        Self {
            name: name.into(),
            hash,
        }
    }

    /// Hash a state name into its registry key.
    ///
    /// 32-bit FNV-1a over the UTF-8 bytes of `name`, reinterpreted as a signed
    /// integer. Usable in constant position:
    ///
    /// ```rust
    /// use statetree::core::{HashedId, StateHash};
    ///
    /// const WALK: StateHash = HashedId::hash_of("Walk");
    /// assert_eq!(WALK, HashedId::new("Walk").hash);
    /// ```
    pub const fn hash_of(name: &str) -> StateHash {
        let bytes = name.as_bytes();
        let mut hash = FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
            i += 1;
        }
        hash as StateHash
    }
}

impl PartialEq for HashedId {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for HashedId {}

impl Hash for HashedId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for HashedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.hash)
    }
}

impl From<&str> for HashedId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for HashedId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn hash_matches_fnv1a_reference_values() {
        assert_eq!(HashedId::hash_of("") as u32, 0x811c_9dc5);
        assert_eq!(HashedId::hash_of("a") as u32, 0xe40c_292c);
        assert_eq!(HashedId::hash_of("foobar") as u32, 0xbf9c_f968);
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let first = HashedId::new("Walk");
        let second = HashedId::new(String::from("Walk"));
        assert_eq!(first.hash, second.hash);
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_names_hash_differently() {
        assert_ne!(HashedId::hash_of("Idle"), HashedId::hash_of("Walk"));
    }

    #[test]
    fn equality_ignores_name() {
        let a = HashedId::with_hash("Alpha", 7);
        let b = HashedId::with_hash("Beta", 7);
        let c = HashedId::with_hash("Alpha", 8);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<HashedId> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_includes_name_and_hash() {
        let id = HashedId::with_hash("Idle", 1);
        assert_eq!(id.to_string(), "Idle (#1)");
    }

    #[test]
    fn identifier_serializes_with_name_and_hash() {
        let id = HashedId::new("Jump");
        let json = serde_json::to_string(&id).unwrap();
        let back: HashedId = serde_json::from_str(&json).unwrap();

        assert_eq!(back.name, "Jump");
        assert_eq!(back.hash, id.hash);
    }
}
