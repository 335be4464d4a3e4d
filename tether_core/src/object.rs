//! Managed object model: classes, field slots, and objects.
//!
//! The interop layer only reads and writes fields; it never interprets them.
//! A `ManagedClass` fixes the name-to-slot mapping once at construction, so a
//! resolved `FieldHandle` stays valid for the process lifetime; this is the property
//! the field-ID cache depends on.
//!
//! # Layout
//!
//! Objects store all fields in one flat slot array indexed by the handle.
//! There is no transition machinery: interop peer classes declare their full
//! field set up front, exactly like the generated peer classes the original
//! layer was built against.

use crate::intern::{InternedName, intern};
use crate::value::{FieldKind, FieldValue};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// Class ID Management
// =============================================================================

/// Global counter for class IDs.
static NEXT_CLASS_ID: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a managed class.
///
/// Field caches are keyed by `(ClassId, struct type)`, so two classes that
/// happen to share field names never share resolved handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    #[inline]
    fn allocate() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

// =============================================================================
// Field Handle
// =============================================================================

/// Resolved access handle for one managed field.
///
/// Opaque to callers; only the class that produced it can interpret it.
/// Resolution is the only operation that can fail; access through a resolved
/// handle is infallible slot indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHandle {
    slot: u16,
}

impl FieldHandle {
    /// Slot index inside the object's field array.
    #[inline]
    pub fn slot(self) -> u16 {
        self.slot
    }
}

// =============================================================================
// Managed Class
// =============================================================================

/// Immutable field layout shared by all objects of one managed type.
#[derive(Debug)]
pub struct ManagedClass {
    name: String,
    id: ClassId,
    /// Name -> slot map, fixed at construction.
    fields: FxHashMap<InternedName, u16>,
    /// Declared kind per slot, in slot order.
    kinds: Vec<FieldKind>,
}

impl ManagedClass {
    /// Build a class from `(field name, kind)` declarations.
    ///
    /// Slot order follows declaration order. Duplicate names keep the first
    /// declaration, matching how the original peer classes were generated.
    pub fn new(name: impl Into<String>, fields: &[(&str, FieldKind)]) -> Arc<Self> {
        let mut map = FxHashMap::default();
        let mut kinds = Vec::with_capacity(fields.len());
        for (field_name, kind) in fields {
            let interned = intern(field_name);
            let slot = kinds.len() as u16;
            if map.contains_key(&interned) {
                continue;
            }
            map.insert(interned, slot);
            kinds.push(*kind);
        }
        Arc::new(Self {
            name: name.into(),
            id: ClassId::allocate(),
            fields: map,
            kinds,
        })
    }

    /// Class name (diagnostics only).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique class id.
    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Number of field slots.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.kinds.len()
    }

    /// Look up the handle for a field by interned name.
    ///
    /// Returns `None` when the class has no such field; the marshaler turns
    /// that into a fail-fast binding-mismatch error.
    #[inline]
    pub fn field(&self, name: InternedName) -> Option<FieldHandle> {
        self.fields.get(&name).map(|&slot| FieldHandle { slot })
    }

    /// Declared kind of the slot behind a handle.
    #[inline]
    pub fn kind_of(&self, handle: FieldHandle) -> FieldKind {
        self.kinds[handle.slot as usize]
    }
}

// =============================================================================
// Managed Object
// =============================================================================

/// One instance of a managed class.
///
/// Slots are initialized to the zero value of their declared kind.
#[derive(Debug, Clone)]
pub struct ManagedObject {
    class: Arc<ManagedClass>,
    slots: Vec<FieldValue>,
}

impl ManagedObject {
    /// Create a zero-initialized instance.
    pub fn new(class: Arc<ManagedClass>) -> Self {
        let slots = class.kinds.iter().map(|&k| FieldValue::zero(k)).collect();
        Self { class, slots }
    }

    /// The object's class.
    #[inline]
    pub fn class(&self) -> &Arc<ManagedClass> {
        &self.class
    }

    /// Read a field through a resolved handle.
    #[inline]
    pub fn get(&self, handle: FieldHandle) -> FieldValue {
        self.slots[handle.slot() as usize]
    }

    /// Write a field through a resolved handle.
    #[inline]
    pub fn set(&mut self, handle: FieldHandle, value: FieldValue) {
        self.slots[handle.slot() as usize] = value;
    }

    /// Convenience: write a field by name. Test and setup helper; the
    /// marshaler itself only goes through resolved handles.
    pub fn set_named(&mut self, name: &str, value: FieldValue) -> bool {
        match self.class.field(intern(name)) {
            Some(handle) => {
                self.set(handle, value);
                true
            }
            None => false,
        }
    }

    /// Convenience: read a field by name.
    pub fn get_named(&self, name: &str) -> Option<FieldValue> {
        self.class.field(intern(name)).map(|h| self.get(h))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn point_class() -> Arc<ManagedClass> {
        ManagedClass::new("Point", &[("x", FieldKind::I32), ("y", FieldKind::I32)])
    }

    #[test]
    fn test_class_ids_unique() {
        let a = point_class();
        let b = point_class();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_field_resolution() {
        let class = point_class();
        let x = class.field(intern("x")).unwrap();
        let y = class.field(intern("y")).unwrap();
        assert_ne!(x.slot(), y.slot());
        assert!(class.field(intern("z")).is_none());
    }

    #[test]
    fn test_slots_zero_initialized() {
        let class = point_class();
        let obj = ManagedObject::new(class.clone());
        let x = class.field(intern("x")).unwrap();
        assert_eq!(obj.get(x), FieldValue::I32(0));
    }

    #[test]
    fn test_get_set_round_trip() {
        let class = point_class();
        let mut obj = ManagedObject::new(class.clone());
        let y = class.field(intern("y")).unwrap();
        obj.set(y, FieldValue::I32(20));
        assert_eq!(obj.get(y), FieldValue::I32(20));
        assert_eq!(obj.get_named("y"), Some(FieldValue::I32(20)));
    }
}
