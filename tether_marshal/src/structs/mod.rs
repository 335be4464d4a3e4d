//! Generated-style struct marshalers.
//!
//! One file per native struct type, each following the same mechanical shape
//! the generator produced in the original layer: a `#[repr(C)]` native type
//! plus a marshaler with the declared field list and both conversion
//! directions. The set here is a representative sample of the full fan-out;
//! every additional struct is one more file of the same pattern.

pub mod event;
pub mod input;
pub mod notify;
pub mod point;
pub mod rect;
