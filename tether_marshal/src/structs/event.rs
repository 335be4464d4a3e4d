//! Event record: N:1 field packing.
//!
//! The managed peer declares two separate scalar fields, `where_v` and
//! `where_h`, while the native layout groups them into one embedded
//! `NativePoint16`. The pairing is explicit by name: `where_v` always maps
//! to `.location.v` and `where_h` to `.location.h`, independent of slot
//! order in the managed class.

use crate::context::{MarshalContext, StructMarshal};
use crate::field_cache::FieldTable;
use tether_core::{FieldValue, ManagedObject, MarshalError};

/// Vertical-first 16-bit point, as the native event layout defines it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativePoint16 {
    pub v: i16,
    pub h: i16,
}

/// Native input event record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativeEventRecord {
    pub kind: i16,
    pub message: i64,
    pub when: i64,
    pub location: NativePoint16,
    pub modifiers: i16,
}

/// Marshaler for [`NativeEventRecord`].
pub struct EventRecordMarshal;

const F_KIND: usize = 0;
const F_MESSAGE: usize = 1;
const F_WHEN: usize = 2;
const F_WHERE_V: usize = 3;
const F_WHERE_H: usize = 4;
const F_MODIFIERS: usize = 5;

impl StructMarshal for EventRecordMarshal {
    type Native = NativeEventRecord;
    const STRUCT_NAME: &'static str = "EventRecord";
    const FIELDS: &'static [&'static str] =
        &["kind", "message", "when", "where_v", "where_h", "modifiers"];

    fn read(
        _ctx: &MarshalContext,
        table: &FieldTable,
        obj: &ManagedObject,
    ) -> Result<NativeEventRecord, MarshalError> {
        Ok(NativeEventRecord {
            kind: obj.get(table.handle(F_KIND)).as_i16()?,
            message: obj.get(table.handle(F_MESSAGE)).as_i64()?,
            when: obj.get(table.handle(F_WHEN)).as_i64()?,
            location: NativePoint16 {
                v: obj.get(table.handle(F_WHERE_V)).as_i16()?,
                h: obj.get(table.handle(F_WHERE_H)).as_i16()?,
            },
            modifiers: obj.get(table.handle(F_MODIFIERS)).as_i16()?,
        })
    }

    fn write(
        _ctx: &MarshalContext,
        table: &FieldTable,
        native: &NativeEventRecord,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError> {
        obj.set(table.handle(F_KIND), FieldValue::I16(native.kind));
        obj.set(table.handle(F_MESSAGE), FieldValue::I64(native.message));
        obj.set(table.handle(F_WHEN), FieldValue::I64(native.when));
        obj.set(table.handle(F_WHERE_V), FieldValue::I16(native.location.v));
        obj.set(table.handle(F_WHERE_H), FieldValue::I16(native.location.h));
        obj.set(table.handle(F_MODIFIERS), FieldValue::I16(native.modifiers));
        Ok(())
    }
}
