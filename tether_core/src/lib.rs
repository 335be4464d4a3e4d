//! Core primitives for the tether managed/native interop layer.
//!
//! This crate provides:
//! - Managed object model (classes, field slots, typed field values)
//! - Name interning for O(1) field and selector comparison
//! - Shared error types for marshaling and dispatch
//!
//! The marshaler (`tether_marshal`) and the dispatcher (`tether_dispatch`)
//! both build on these primitives but have no dependency on each other.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod intern;
pub mod object;
pub mod value;

// Re-export commonly used items
pub use error::{DispatchError, MarshalError};
pub use intern::{InternedName, intern};
pub use object::{ClassId, FieldHandle, ManagedClass, ManagedObject};
pub use value::{FieldKind, FieldValue};
