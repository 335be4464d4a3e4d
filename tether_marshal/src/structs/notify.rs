//! Notification header and its composed derivative.
//!
//! `NativeNotifyHeader` is the base every notification struct embeds at
//! offset 0. The managed peer stores `source` as a 32-bit handle while the
//! native slot is pointer-sized: the widening on read and truncation on
//! write are the platform-specific conversions the interop layer exists to
//! perform, not errors.
//!
//! `NativeNotifyScroll` demonstrates composition: its marshaler delegates
//! the embedded header to the base marshaler (exactly once per operation)
//! and then handles only its derived fields.

use crate::context::{MarshalContext, StructMarshal};
use crate::field_cache::FieldTable;
use tether_core::{FieldValue, ManagedObject, MarshalError};

// =============================================================================
// Base: NotifyHeader
// =============================================================================

/// Common header at the front of every native notification struct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativeNotifyHeader {
    /// Originating native handle; managed side stores this as `i32`.
    pub source: usize,
    pub id: usize,
    pub code: i32,
}

/// Marshaler for [`NativeNotifyHeader`].
pub struct NotifyHeaderMarshal;

const F_SOURCE: usize = 0;
const F_ID: usize = 1;
const F_CODE: usize = 2;

impl StructMarshal for NotifyHeaderMarshal {
    type Native = NativeNotifyHeader;
    const STRUCT_NAME: &'static str = "NotifyHeader";
    const FIELDS: &'static [&'static str] = &["source", "id", "code"];

    fn read(
        _ctx: &MarshalContext,
        table: &FieldTable,
        obj: &ManagedObject,
    ) -> Result<NativeNotifyHeader, MarshalError> {
        Ok(NativeNotifyHeader {
            // Managed 32-bit handle widened into a pointer-sized native slot.
            source: obj.get(table.handle(F_SOURCE)).as_ptr_sized()?,
            id: obj.get(table.handle(F_ID)).as_ptr_sized()?,
            code: obj.get(table.handle(F_CODE)).as_i32()?,
        })
    }

    fn write(
        _ctx: &MarshalContext,
        table: &FieldTable,
        native: &NativeNotifyHeader,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError> {
        // Pointer-sized native values truncated back into 32-bit managed
        // fields, matching the managed peer's declared width.
        obj.set(table.handle(F_SOURCE), FieldValue::I32(native.source as i32));
        obj.set(table.handle(F_ID), FieldValue::I32(native.id as i32));
        obj.set(table.handle(F_CODE), FieldValue::I32(native.code));
        Ok(())
    }
}

// =============================================================================
// Derived: NotifyScroll
// =============================================================================

/// Scroll notification: embedded header plus scroll position data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativeNotifyScroll {
    pub header: NativeNotifyHeader,
    pub position: i32,
    pub track: i32,
}

/// Marshaler for [`NativeNotifyScroll`].
///
/// Base fields go through [`NotifyHeaderMarshal`] via the context, so the
/// base marshaler's cache, statistics, and conversions apply unchanged.
pub struct NotifyScrollMarshal;

const F_POSITION: usize = 0;
const F_TRACK: usize = 1;

impl StructMarshal for NotifyScrollMarshal {
    type Native = NativeNotifyScroll;
    const STRUCT_NAME: &'static str = "NotifyScroll";
    // Derived-only fields; the base declares its own.
    const FIELDS: &'static [&'static str] = &["position", "track"];

    fn read(
        ctx: &MarshalContext,
        table: &FieldTable,
        obj: &ManagedObject,
    ) -> Result<NativeNotifyScroll, MarshalError> {
        let header = ctx.read::<NotifyHeaderMarshal>(obj)?;
        Ok(NativeNotifyScroll {
            header,
            position: obj.get(table.handle(F_POSITION)).as_i32()?,
            track: obj.get(table.handle(F_TRACK)).as_i32()?,
        })
    }

    fn write(
        ctx: &MarshalContext,
        table: &FieldTable,
        native: &NativeNotifyScroll,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError> {
        ctx.write::<NotifyHeaderMarshal>(&native.header, obj)?;
        obj.set(table.handle(F_POSITION), FieldValue::I32(native.position));
        obj.set(table.handle(F_TRACK), FieldValue::I32(native.track));
        Ok(())
    }
}
