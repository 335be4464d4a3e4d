//! Name interning for field names and selectors.
//!
//! Field names are compared on every cache miss during field resolution, and
//! selectors are passed through the dispatcher unchanged. Interning both
//! turns every later comparison into a `u32` equality check.
//!
//! The table only grows; interned names live for the process lifetime, which
//! matches the lifetime of the field caches that reference them.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

// =============================================================================
// Interned Name
// =============================================================================

/// Handle to an interned name.
///
/// Equality and hashing operate on the index, not the string contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedName(u32);

impl InternedName {
    /// Raw index into the intern table.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Resolve back to the string this name was interned from.
    #[inline]
    pub fn as_str(self) -> &'static str {
        intern_table().resolve(self)
    }
}

impl std::fmt::Display for InternedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Intern Table
// =============================================================================

struct InternTable {
    /// Map from name to handle.
    lookup: RwLock<FxHashMap<&'static str, InternedName>>,
    /// Reverse map, indexed by handle.
    names: RwLock<Vec<&'static str>>,
}

impl InternTable {
    fn new() -> Self {
        Self {
            lookup: RwLock::new(FxHashMap::default()),
            names: RwLock::new(Vec::new()),
        }
    }

    fn intern(&self, name: &str) -> InternedName {
        if let Some(&id) = self.lookup.read().get(name) {
            return id;
        }

        let mut lookup = self.lookup.write();
        // Re-check under the write lock; another thread may have won the race.
        if let Some(&id) = lookup.get(name) {
            return id;
        }

        let mut names = self.names.write();
        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = InternedName(names.len() as u32);
        names.push(leaked);
        lookup.insert(leaked, id);
        id
    }

    fn resolve(&self, id: InternedName) -> &'static str {
        self.names.read()[id.0 as usize]
    }
}

/// Global intern table, initialized lazily on first use.
static INTERN_TABLE: OnceLock<InternTable> = OnceLock::new();

#[inline]
fn intern_table() -> &'static InternTable {
    INTERN_TABLE.get_or_init(InternTable::new)
}

/// Intern a name, returning a process-lifetime handle.
///
/// Interning the same string twice returns the same handle.
#[inline]
pub fn intern(name: &str) -> InternedName {
    intern_table().intern(name)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_handle() {
        let a = intern("where_x");
        let b = intern("where_x");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_names_different_handles() {
        let a = intern("left");
        let b = intern("right");
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_round_trip() {
        let id = intern("modifiers");
        assert_eq!(id.as_str(), "modifiers");
    }
}
