//! Input event: union-like payload reinterpretation.
//!
//! The native layout overlays a mouse payload and a key payload in the same
//! eight bytes, discriminated by `tag`. The marshaler reads the tag first
//! and packs or unpacks the matching overlay through the byte
//! reinterpretation helpers; the unused overlay's managed fields are left
//! alone in both directions.

use crate::context::{MarshalContext, StructMarshal};
use crate::field_cache::FieldTable;
use crate::reinterpret;
use tether_core::{FieldValue, ManagedObject, MarshalError};

/// Tag value selecting the mouse overlay.
pub const INPUT_TAG_MOUSE: i32 = 1;
/// Tag value selecting the key overlay.
pub const INPUT_TAG_KEY: i32 = 2;

/// Payload overlay size in bytes (the larger of the two variants).
pub const INPUT_PAYLOAD_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
struct MousePayload {
    x: i16,
    y: i16,
    buttons: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
struct KeyPayload {
    code: i32,
    modifiers: i32,
}

/// Native input event: tag plus overlaid payload bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativeInputEvent {
    pub tag: i32,
    pub payload: [u8; INPUT_PAYLOAD_SIZE],
}

/// Marshaler for [`NativeInputEvent`].
pub struct InputEventMarshal;

const F_TAG: usize = 0;
const F_MOUSE_X: usize = 1;
const F_MOUSE_Y: usize = 2;
const F_BUTTONS: usize = 3;
const F_KEY_CODE: usize = 4;
const F_KEY_MODIFIERS: usize = 5;

impl StructMarshal for InputEventMarshal {
    type Native = NativeInputEvent;
    const STRUCT_NAME: &'static str = "InputEvent";
    const FIELDS: &'static [&'static str] = &[
        "tag",
        "mouse_x",
        "mouse_y",
        "buttons",
        "key_code",
        "key_modifiers",
    ];

    fn read(
        _ctx: &MarshalContext,
        table: &FieldTable,
        obj: &ManagedObject,
    ) -> Result<NativeInputEvent, MarshalError> {
        let tag = obj.get(table.handle(F_TAG)).as_i32()?;
        let mut payload = [0u8; INPUT_PAYLOAD_SIZE];
        match tag {
            INPUT_TAG_MOUSE => {
                let mouse = MousePayload {
                    x: obj.get(table.handle(F_MOUSE_X)).as_i16()?,
                    y: obj.get(table.handle(F_MOUSE_Y)).as_i16()?,
                    buttons: obj.get(table.handle(F_BUTTONS)).as_i32()?,
                };
                reinterpret::store(&mouse, &mut payload);
            }
            INPUT_TAG_KEY => {
                let key = KeyPayload {
                    code: obj.get(table.handle(F_KEY_CODE)).as_i32()?,
                    modifiers: obj.get(table.handle(F_KEY_MODIFIERS)).as_i32()?,
                };
                reinterpret::store(&key, &mut payload);
            }
            // Unknown tags carry a zeroed payload through unchanged.
            _ => {}
        }
        Ok(NativeInputEvent { tag, payload })
    }

    fn write(
        _ctx: &MarshalContext,
        table: &FieldTable,
        native: &NativeInputEvent,
        obj: &mut ManagedObject,
    ) -> Result<(), MarshalError> {
        obj.set(table.handle(F_TAG), FieldValue::I32(native.tag));
        match native.tag {
            INPUT_TAG_MOUSE => {
                let mouse: MousePayload = reinterpret::load(&native.payload);
                obj.set(table.handle(F_MOUSE_X), FieldValue::I16(mouse.x));
                obj.set(table.handle(F_MOUSE_Y), FieldValue::I16(mouse.y));
                obj.set(table.handle(F_BUTTONS), FieldValue::I32(mouse.buttons));
            }
            INPUT_TAG_KEY => {
                let key: KeyPayload = reinterpret::load(&native.payload);
                obj.set(table.handle(F_KEY_CODE), FieldValue::I32(key.code));
                obj.set(table.handle(F_KEY_MODIFIERS), FieldValue::I32(key.modifiers));
            }
            _ => {}
        }
        Ok(())
    }
}
