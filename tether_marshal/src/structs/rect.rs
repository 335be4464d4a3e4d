//! Rect marshaler.

use crate::context::{MarshalContext, StructMarshal};
use crate::field_cache::FieldTable;
use tether_core::{FieldValue, ManagedObject, MarshalError};

/// Native rectangle in edge form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativeRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Marshaler for [`NativeRect`].
pub struct RectMarshal;

const F_LEFT: usize = 0;
const F_TOP: usize = 1;
const F_RIGHT: usize = 2;
const F_BOTTOM: usize = 3;

impl StructMarshal for RectMarshal {
    type Native = NativeRect;
    const STRUCT_NAME: &'static str = "Rect";
    const FIELDS: &'static [&'static str] = &["left", "top", "right", "bottom"];

    fn read(
        _ctx: &MarshalContext,
        table: &FieldTable,
        obj: &ManagedObject,
    ) -> Result<NativeRect, MarshalError> {
        Ok(NativeRect {
            left: obj.get(table.handle(F_LEFT)).as_i32()?,
            top: obj.get(table.handle(F_TOP)).as_i32()?,
            right: obj.get(table.handle(F_RIGHT)).as_i32()?,
            bottom: obj.get(table.handle(F_BOTTOM)).as_i32()?,
        })
    }

    fn write(
        _ctx: &MarshalContext,
        table: &FieldTable,
        native: &NativeRect,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError> {
        obj.set(table.handle(F_LEFT), FieldValue::I32(native.left));
        obj.set(table.handle(F_TOP), FieldValue::I32(native.top));
        obj.set(table.handle(F_RIGHT), FieldValue::I32(native.right));
        obj.set(table.handle(F_BOTTOM), FieldValue::I32(native.bottom));
        Ok(())
    }
}
