//! Integration tests for the field-ID cache and struct marshalers.
//!
//! Coverage:
//! - Round-trip fidelity (read then write copies every mapped field)
//! - Concrete byte-layout expectations for the Point scenario
//! - Composition (base marshaler called exactly once, no clobbering)
//! - N:1 packing independence from write order
//! - Binding-mismatch failure behavior
//! - Deliberate narrowing/widening of the pointer-sized header fields

use std::sync::Arc;
use tether_core::{FieldKind, FieldValue, ManagedClass, ManagedObject, MarshalError};
use tether_marshal::{
    EventRecordMarshal, InputEventMarshal, MarshalContext, NativeNotifyHeader, NativeNotifyScroll,
    NativePoint, NotifyHeaderMarshal, NotifyScrollMarshal, PointMarshal, RectMarshal,
};

// =============================================================================
// Class fixtures (managed peers as the generator would declare them)
// =============================================================================

fn point_class() -> Arc<ManagedClass> {
    ManagedClass::new("Point", &[("x", FieldKind::I32), ("y", FieldKind::I32)])
}

fn rect_class() -> Arc<ManagedClass> {
    ManagedClass::new(
        "Rect",
        &[
            ("left", FieldKind::I32),
            ("top", FieldKind::I32),
            ("right", FieldKind::I32),
            ("bottom", FieldKind::I32),
        ],
    )
}

fn notify_scroll_class() -> Arc<ManagedClass> {
    ManagedClass::new(
        "NotifyScroll",
        &[
            ("source", FieldKind::I32),
            ("id", FieldKind::I32),
            ("code", FieldKind::I32),
            ("position", FieldKind::I32),
            ("track", FieldKind::I32),
        ],
    )
}

fn event_class() -> Arc<ManagedClass> {
    ManagedClass::new(
        "EventRecord",
        &[
            ("kind", FieldKind::I16),
            ("message", FieldKind::I64),
            ("when", FieldKind::I64),
            ("where_v", FieldKind::I16),
            ("where_h", FieldKind::I16),
            ("modifiers", FieldKind::I16),
        ],
    )
}

fn input_class() -> Arc<ManagedClass> {
    ManagedClass::new(
        "InputEvent",
        &[
            ("tag", FieldKind::I32),
            ("mouse_x", FieldKind::I16),
            ("mouse_y", FieldKind::I16),
            ("buttons", FieldKind::I32),
            ("key_code", FieldKind::I32),
            ("key_modifiers", FieldKind::I32),
        ],
    )
}

// =============================================================================
// Point: concrete layout scenario
// =============================================================================

#[test]
fn test_point_read_produces_expected_bytes() {
    let ctx = MarshalContext::new();
    let mut obj = ManagedObject::new(point_class());
    obj.set_named("x", FieldValue::I32(10));
    obj.set_named("y", FieldValue::I32(20));

    let native = ctx.read::<PointMarshal>(&obj).unwrap();
    assert_eq!(native, NativePoint { x: 10, y: 20 });

    // x lives at offset 0, y at offset 4, platform-default alignment.
    let bytes: [u8; 8] = unsafe { std::mem::transmute(native) };
    assert_eq!(&bytes[0..4], &10i32.to_ne_bytes());
    assert_eq!(&bytes[4..8], &20i32.to_ne_bytes());
}

#[test]
fn test_point_write_back_updates_managed_fields() {
    let ctx = MarshalContext::new();
    let mut obj = ManagedObject::new(point_class());

    let native = NativePoint { x: 30, y: 40 };
    ctx.write::<PointMarshal>(&native, &mut obj).unwrap();

    assert_eq!(obj.get_named("x"), Some(FieldValue::I32(30)));
    assert_eq!(obj.get_named("y"), Some(FieldValue::I32(40)));
}

// =============================================================================
// Round-trip fidelity
// =============================================================================

#[test]
fn test_rect_round_trip_copies_every_field() {
    let ctx = MarshalContext::new();
    let class = rect_class();

    let mut source = ManagedObject::new(class.clone());
    source.set_named("left", FieldValue::I32(-5));
    source.set_named("top", FieldValue::I32(7));
    source.set_named("right", FieldValue::I32(640));
    source.set_named("bottom", FieldValue::I32(480));

    let native = ctx.read::<RectMarshal>(&source).unwrap();
    let mut dest = ManagedObject::new(class);
    ctx.write::<RectMarshal>(&native, &mut dest).unwrap();

    for field in ["left", "top", "right", "bottom"] {
        assert_eq!(dest.get_named(field), source.get_named(field), "{field}");
    }
}

#[test]
fn test_event_round_trip() {
    let ctx = MarshalContext::new();
    let class = event_class();

    let mut source = ManagedObject::new(class.clone());
    source.set_named("kind", FieldValue::I16(3));
    source.set_named("message", FieldValue::I64(0x0102_0304_0506));
    source.set_named("when", FieldValue::I64(123_456_789));
    source.set_named("where_v", FieldValue::I16(-12));
    source.set_named("where_h", FieldValue::I16(340));
    source.set_named("modifiers", FieldValue::I16(0x11));

    let native = ctx.read::<EventRecordMarshal>(&source).unwrap();
    let mut dest = ManagedObject::new(class);
    ctx.write::<EventRecordMarshal>(&native, &mut dest).unwrap();

    for field in ["kind", "message", "when", "where_v", "where_h", "modifiers"] {
        assert_eq!(dest.get_named(field), source.get_named(field), "{field}");
    }
}

// =============================================================================
// Resolution idempotence
// =============================================================================

#[test]
fn test_resolution_idempotent_across_repeated_reads() {
    let ctx = MarshalContext::new();
    let mut obj = ManagedObject::new(point_class());
    obj.set_named("x", FieldValue::I32(1));
    obj.set_named("y", FieldValue::I32(2));

    let first = ctx.read::<PointMarshal>(&obj).unwrap();
    let second = ctx.read::<PointMarshal>(&obj).unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.stats().resolves(), 1, "second read reuses the table");
}

#[test]
fn test_independent_resolutions_behave_identically() {
    // Two contexts resolve independently; reads and writes agree.
    let class = point_class();
    let mut obj = ManagedObject::new(class.clone());
    obj.set_named("x", FieldValue::I32(9));
    obj.set_named("y", FieldValue::I32(-9));

    let a = MarshalContext::new().read::<PointMarshal>(&obj).unwrap();
    let b = MarshalContext::new().read::<PointMarshal>(&obj).unwrap();
    assert_eq!(a, b);
}

// =============================================================================
// N:1 packing
// =============================================================================

#[test]
fn test_n_to_one_packing_independent_of_write_order() {
    let ctx = MarshalContext::new();
    let class = event_class();

    // where_v written first.
    let mut first = ManagedObject::new(class.clone());
    first.set_named("where_v", FieldValue::I16(5));
    first.set_named("where_h", FieldValue::I16(6));

    // where_h written first.
    let mut second = ManagedObject::new(class);
    second.set_named("where_h", FieldValue::I16(6));
    second.set_named("where_v", FieldValue::I16(5));

    let a = ctx.read::<EventRecordMarshal>(&first).unwrap();
    let b = ctx.read::<EventRecordMarshal>(&second).unwrap();

    assert_eq!(a.location, b.location);
    assert_eq!(a.location.v, 5);
    assert_eq!(a.location.h, 6);
}

#[test]
fn test_n_to_one_packing_pairs_by_name_not_position() {
    // Managed class declares where_h before where_v; packing must still
    // route where_v to .v and where_h to .h.
    let ctx = MarshalContext::new();
    let swapped = ManagedClass::new(
        "EventRecord",
        &[
            ("kind", FieldKind::I16),
            ("message", FieldKind::I64),
            ("when", FieldKind::I64),
            ("where_h", FieldKind::I16),
            ("where_v", FieldKind::I16),
            ("modifiers", FieldKind::I16),
        ],
    );
    let mut obj = ManagedObject::new(swapped);
    obj.set_named("where_v", FieldValue::I16(50));
    obj.set_named("where_h", FieldValue::I16(60));

    let native = ctx.read::<EventRecordMarshal>(&obj).unwrap();
    assert_eq!(native.location.v, 50);
    assert_eq!(native.location.h, 60);
}

// =============================================================================
// Composition
// =============================================================================

#[test]
fn test_composed_read_calls_base_exactly_once() {
    let ctx = MarshalContext::new();
    let mut obj = ManagedObject::new(notify_scroll_class());
    obj.set_named("code", FieldValue::I32(-3));
    obj.set_named("position", FieldValue::I32(120));

    let native = ctx.read::<NotifyScrollMarshal>(&obj).unwrap();
    assert_eq!(native.header.code, -3);
    assert_eq!(native.position, 120);

    assert_eq!(ctx.stats().counts_for("NotifyHeader").reads, 1);
    assert_eq!(ctx.stats().counts_for("NotifyScroll").reads, 1);
}

#[test]
fn test_composed_write_calls_base_exactly_once() {
    let ctx = MarshalContext::new();
    let mut obj = ManagedObject::new(notify_scroll_class());

    let native = NativeNotifyScroll {
        header: NativeNotifyHeader {
            source: 0x20,
            id: 9,
            code: 4,
        },
        position: 55,
        track: 56,
    };
    ctx.write::<NotifyScrollMarshal>(&native, &mut obj).unwrap();

    assert_eq!(ctx.stats().counts_for("NotifyHeader").writes, 1);
    assert_eq!(obj.get_named("source"), Some(FieldValue::I32(0x20)));
    assert_eq!(obj.get_named("track"), Some(FieldValue::I32(56)));
}

#[test]
fn test_derived_fields_never_clobber_base_fields() {
    let ctx = MarshalContext::new();
    let mut obj = ManagedObject::new(notify_scroll_class());
    obj.set_named("source", FieldValue::I32(0x1111));
    obj.set_named("id", FieldValue::I32(7));
    obj.set_named("code", FieldValue::I32(2));
    obj.set_named("position", FieldValue::I32(999));
    obj.set_named("track", FieldValue::I32(998));

    let native = ctx.read::<NotifyScrollMarshal>(&obj).unwrap();

    // Base portion carries base values, derived portion derived values.
    assert_eq!(native.header.source, 0x1111);
    assert_eq!(native.header.id, 7);
    assert_eq!(native.header.code, 2);
    assert_eq!(native.position, 999);
    assert_eq!(native.track, 998);
}

// =============================================================================
// Narrowing / widening
// =============================================================================

#[test]
fn test_header_source_widens_and_truncates_deliberately() {
    let ctx = MarshalContext::new();
    let class = ManagedClass::new(
        "NotifyHeader",
        &[
            ("source", FieldKind::I32),
            ("id", FieldKind::I32),
            ("code", FieldKind::I32),
        ],
    );
    let mut obj = ManagedObject::new(class);

    // Negative 32-bit handle sign-extends into the pointer-sized slot.
    obj.set_named("source", FieldValue::I32(-1));
    let native = ctx.read::<NotifyHeaderMarshal>(&obj).unwrap();
    assert_eq!(native.source, usize::MAX);

    // A pointer-sized value truncates back to the managed 32-bit width.
    let wide = NativeNotifyHeader {
        source: 0x1_0000_0042,
        id: 0,
        code: 0,
    };
    ctx.write::<NotifyHeaderMarshal>(&wide, &mut obj).unwrap();
    assert_eq!(obj.get_named("source"), Some(FieldValue::I32(0x42)));
}

// =============================================================================
// Union-like reinterpretation
// =============================================================================

#[test]
fn test_input_event_mouse_overlay_round_trip() {
    let ctx = MarshalContext::new();
    let class = input_class();

    let mut source = ManagedObject::new(class.clone());
    source.set_named("tag", FieldValue::I32(tether_marshal::structs::input::INPUT_TAG_MOUSE));
    source.set_named("mouse_x", FieldValue::I16(-4));
    source.set_named("mouse_y", FieldValue::I16(77));
    source.set_named("buttons", FieldValue::I32(0b101));
    // Key fields deliberately populated; they must not leak into the overlay.
    source.set_named("key_code", FieldValue::I32(0x7FFF));

    let native = ctx.read::<InputEventMarshal>(&source).unwrap();
    let mut dest = ManagedObject::new(class);
    ctx.write::<InputEventMarshal>(&native, &mut dest).unwrap();

    assert_eq!(dest.get_named("mouse_x"), Some(FieldValue::I16(-4)));
    assert_eq!(dest.get_named("mouse_y"), Some(FieldValue::I16(77)));
    assert_eq!(dest.get_named("buttons"), Some(FieldValue::I32(0b101)));
    // The key overlay's managed fields stay at their zero defaults.
    assert_eq!(dest.get_named("key_code"), Some(FieldValue::I32(0)));
}

#[test]
fn test_input_event_key_overlay_round_trip() {
    let ctx = MarshalContext::new();
    let class = input_class();

    let mut source = ManagedObject::new(class.clone());
    source.set_named("tag", FieldValue::I32(tether_marshal::structs::input::INPUT_TAG_KEY));
    source.set_named("key_code", FieldValue::I32(13));
    source.set_named("key_modifiers", FieldValue::I32(4));

    let native = ctx.read::<InputEventMarshal>(&source).unwrap();
    let mut dest = ManagedObject::new(class);
    ctx.write::<InputEventMarshal>(&native, &mut dest).unwrap();

    assert_eq!(dest.get_named("key_code"), Some(FieldValue::I32(13)));
    assert_eq!(dest.get_named("key_modifiers"), Some(FieldValue::I32(4)));
}

// =============================================================================
// Binding mismatch
// =============================================================================

#[test]
fn test_missing_field_aborts_marshal() {
    let ctx = MarshalContext::new();
    // A drifted managed peer: renamed `y` to `why`.
    let drifted = ManagedClass::new("Point", &[("x", FieldKind::I32), ("why", FieldKind::I32)]);
    let obj = ManagedObject::new(drifted);

    let err = ctx.read::<PointMarshal>(&obj).unwrap_err();
    assert!(matches!(
        err,
        MarshalError::MissingField {
            struct_name: "Point",
            field: "y",
            ..
        }
    ));
}

#[test]
fn test_concurrent_first_use_resolves_once() {
    let ctx = Arc::new(MarshalContext::new());
    let class = point_class();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let class = Arc::clone(&class);
            std::thread::spawn(move || {
                let mut obj = ManagedObject::new(class);
                obj.set_named("x", FieldValue::I32(1));
                ctx.read::<PointMarshal>(&obj).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let native = handle.join().unwrap();
        assert_eq!(native.x, 1);
    }

    assert_eq!(ctx.stats().resolves(), 1);
    assert_eq!(ctx.stats().reads(), 8);
}
