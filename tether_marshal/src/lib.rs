//! Field-ID cache and struct marshaler.
//!
//! Bidirectional conversion between managed objects and natively-laid-out
//! `#[repr(C)]` values, with zero per-call field-resolution cost after the
//! first use of each `(managed class, native struct)` pair.
//!
//! # Cache Hierarchy
//!
//! 1. **Field table** - per (class, struct) pair, resolved once, immutable
//! 2. **Registry** - concurrent compute-or-fetch map owned by a
//!    [`MarshalContext`], so a table is published fully resolved or not at all
//!
//! # Composition Rules
//!
//! - Composed structs delegate their base portion to the base marshaler
//!   (exactly once per read/write), then fill derived-only fields.
//! - N:1 packing maps several managed scalar fields into one native
//!   sub-struct by explicit name pairing, never by position.
//!
//! # Failure Model
//!
//! A managed class missing a field the native layout requires is a binding
//! mismatch: resolution fails fast, nothing is cached, and the marshal
//! operation aborts. There is nothing to recover at runtime; the generated
//! marshaler and the managed type have drifted out of sync.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod context;
pub mod field_cache;
pub mod reinterpret;
pub mod structs;

// Re-export commonly used items
pub use context::{MarshalContext, MarshalStats, StructMarshal, TypeCounts};
pub use field_cache::FieldTable;
pub use structs::event::{EventRecordMarshal, NativeEventRecord, NativePoint16};
pub use structs::input::{InputEventMarshal, NativeInputEvent};
pub use structs::notify::{
    NativeNotifyHeader, NativeNotifyScroll, NotifyHeaderMarshal, NotifyScrollMarshal,
};
pub use structs::point::{NativePoint, PointMarshal};
pub use structs::rect::{NativeRect, RectMarshal};
