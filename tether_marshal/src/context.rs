//! Marshaling context: registry of resolved field tables plus statistics.
//!
//! The original layer kept one unguarded global cache per struct type,
//! relying on idempotent re-resolution instead of synchronization. Here the
//! registry is an explicit object with an atomic compute-or-fetch entry API:
//! a table is published fully resolved or not at all, which makes the
//! idempotence requirement a structural guarantee instead of an assumed
//! property.
//!
//! # Thread Safety
//!
//! The registry is sharded (`DashMap`); first use of a key blocks concurrent
//! resolvers for that key only. Statistics are relaxed atomics.

use crate::field_cache::FieldTable;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tether_core::{ClassId, ManagedClass, ManagedObject, MarshalError};

// =============================================================================
// Struct Marshal Trait
// =============================================================================

/// One generated struct marshaler.
///
/// Implementations declare the native value type, the managed fields they
/// touch (in handle-table order), and the two conversion directions. The
/// context owns resolution and caching; marshalers only see resolved tables.
pub trait StructMarshal {
    /// The natively-laid-out value this marshaler produces and consumes.
    type Native: Copy;

    /// Native struct type name; keys the field-table registry.
    const STRUCT_NAME: &'static str;

    /// Managed field names in handle-table order.
    const FIELDS: &'static [&'static str];

    /// Fetch managed fields into a fresh native value.
    fn read(
        ctx: &MarshalContext,
        table: &FieldTable,
        obj: &ManagedObject,
    ) -> Result<Self::Native, MarshalError>;

    /// Push native values back into managed fields.
    fn write(
        ctx: &MarshalContext,
        table: &FieldTable,
        native: &Self::Native,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError>;
}

// =============================================================================
// Statistics
// =============================================================================

/// Read/write counts for one struct type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub reads: u64,
    pub writes: u64,
}

/// Marshal operation counters (for profiling and the composition tests).
#[derive(Debug, Default)]
pub struct MarshalStats {
    resolves: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    per_type: DashMap<&'static str, (AtomicU64, AtomicU64), FxBuildHasher>,
}

impl MarshalStats {
    fn record_resolve(&self) {
        self.resolves.fetch_add(1, Ordering::Relaxed);
    }

    fn record_read(&self, struct_name: &'static str) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.per_type
            .entry(struct_name)
            .or_default()
            .0
            .fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self, struct_name: &'static str) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.per_type
            .entry(struct_name)
            .or_default()
            .1
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of field-table resolutions performed.
    pub fn resolves(&self) -> u64 {
        self.resolves.load(Ordering::Relaxed)
    }

    /// Total reads across all struct types.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total writes across all struct types.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Read/write counts for one struct type name.
    pub fn counts_for(&self, struct_name: &str) -> TypeCounts {
        self.per_type
            .get(struct_name)
            .map(|entry| TypeCounts {
                reads: entry.0.load(Ordering::Relaxed),
                writes: entry.1.load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Marshal Context
// =============================================================================

/// Owner of the field-table registry.
///
/// One context per embedding runtime; all marshal operations go through it.
/// Creating a second context yields independent caches with identical
/// behavior (resolution is pure).
#[derive(Debug, Default)]
pub struct MarshalContext {
    tables: DashMap<(ClassId, &'static str), Arc<FieldTable>, FxBuildHasher>,
    stats: MarshalStats,
}

impl MarshalContext {
    /// Create an empty context. Tables populate lazily on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the resolved field table for `M` against `class`, resolving it
    /// on first use.
    ///
    /// Concurrent first use for the same `(class, struct)` key serializes on
    /// the registry entry: exactly one resolution runs, the rest observe its
    /// result. A failed resolution caches nothing, so a later call against a
    /// corrected class resolves fresh.
    pub fn table_for<M: StructMarshal>(
        &self,
        class: &ManagedClass,
    ) -> Result<Arc<FieldTable>, MarshalError> {
        let key = (class.id(), M::STRUCT_NAME);

        // Fast path: already resolved.
        if let Some(table) = self.tables.get(&key) {
            return Ok(table.clone());
        }

        match self.tables.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                self.stats.record_resolve();
                let table = Arc::new(FieldTable::resolve(M::STRUCT_NAME, M::FIELDS, class)?);
                Ok(entry.insert(table).clone())
            }
        }
    }

    /// Marshal a managed object into a fresh native value.
    pub fn read<M: StructMarshal>(&self, obj: &ManagedObject) -> Result<M::Native, MarshalError> {
        let table = self.table_for::<M>(obj.class())?;
        self.stats.record_read(M::STRUCT_NAME);
        M::read(self, &table, obj)
    }

    /// Unmarshal a native value back into a managed object's fields.
    pub fn write<M: StructMarshal>(
        &self,
        native: &M::Native,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError> {
        let table = self.table_for::<M>(obj.class())?;
        self.stats.record_write(M::STRUCT_NAME);
        M::write(self, &table, native, obj)
    }

    /// Operation counters.
    pub fn stats(&self) -> &MarshalStats {
        &self.stats
    }
}

// =============================================================================
// Tests
// =============================================================================
