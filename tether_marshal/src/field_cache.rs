//! Resolved field tables: the per-type field-ID cache entries.
//!
//! A [`FieldTable`] is the resolved form of one struct marshaler's field list
//! against one managed class: an array of access handles in the marshaler's
//! declared field order. Resolution happens at most once per
//! `(class, struct)` pair for the process lifetime; the table is immutable
//! afterwards, so concurrent readers never observe a partially-built cache.

use smallvec::SmallVec;
use tether_core::{ClassId, FieldHandle, ManagedClass, MarshalError, intern};

/// Resolved access handles for one native struct type against one class.
///
/// Handles are stored in the marshaler's declared field order and fetched by
/// index; the marshaler's field constants and the table indices line up by
/// construction.
#[derive(Debug)]
pub struct FieldTable {
    struct_name: &'static str,
    class_id: ClassId,
    handles: SmallVec<[FieldHandle; 8]>,
}

impl FieldTable {
    /// Resolve every field the marshaler requires, all-or-nothing.
    ///
    /// The first missing field aborts resolution with a binding-mismatch
    /// error and no table is produced. Field lookup is side-effect-free, so
    /// a concurrent duplicate resolution yields an identical table.
    pub fn resolve(
        struct_name: &'static str,
        fields: &[&'static str],
        class: &ManagedClass,
    ) -> Result<Self, MarshalError> {
        let mut handles = SmallVec::with_capacity(fields.len());
        for &field in fields {
            let handle =
                class
                    .field(intern(field))
                    .ok_or_else(|| MarshalError::MissingField {
                        struct_name,
                        class_name: class.name().to_string(),
                        field,
                    })?;
            handles.push(handle);
        }
        Ok(Self {
            struct_name,
            class_id: class.id(),
            handles,
        })
    }

    /// Native struct type this table was resolved for.
    #[inline]
    pub fn struct_name(&self) -> &'static str {
        self.struct_name
    }

    /// Managed class this table was resolved against.
    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Handle for the marshaler's `index`-th declared field.
    #[inline]
    pub fn handle(&self, index: usize) -> FieldHandle {
        self.handles[index]
    }

    /// Number of resolved handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the table resolved zero fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
