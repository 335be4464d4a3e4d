//! Point: the simplest single-level struct marshaler.

use crate::context::{MarshalContext, StructMarshal};
use crate::field_cache::FieldTable;
use tether_core::{FieldValue, ManagedObject, MarshalError};

/// Native point, platform-default alignment: `x` at offset 0, `y` at 4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativePoint {
    pub x: i32,
    pub y: i32,
}

/// Marshaler for [`NativePoint`].
pub struct PointMarshal;

// Field-table indices, in FIELDS order.
const F_X: usize = 0;
const F_Y: usize = 1;

impl StructMarshal for PointMarshal {
    type Native = NativePoint;
    const STRUCT_NAME: &'static str = "Point";
    const FIELDS: &'static [&'static str] = &["x", "y"];

    fn read(
        _ctx: &MarshalContext,
        table: &FieldTable,
        obj: &ManagedObject,
    ) -> Result<NativePoint, MarshalError> {
        Ok(NativePoint {
            x: obj.get(table.handle(F_X)).as_i32()?,
            y: obj.get(table.handle(F_Y)).as_i32()?,
        })
    }

    fn write(
        _ctx: &MarshalContext,
        table: &FieldTable,
        native: &NativePoint,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError> {
        obj.set(table.handle(F_X), FieldValue::I32(native.x));
        obj.set(table.handle(F_Y), FieldValue::I32(native.y));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_native_abi() {
        assert_eq!(std::mem::size_of::<NativePoint>(), 8);
        assert_eq!(std::mem::offset_of!(NativePoint, x), 0);
        assert_eq!(std::mem::offset_of!(NativePoint, y), 4);
    }
}
