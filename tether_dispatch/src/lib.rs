//! Dynamic native call dispatcher.
//!
//! Invokes a native function at an address known only at the call site, with
//! an argument tuple of mixed scalar/pointer/struct-by-value kinds. The
//! original layer expressed this as hundreds of hand-written function-pointer
//! casts, one per argument-kind combination; here a single dispatcher builds
//! the call frame at runtime from a small argument-kind sum type.
//!
//! # Struct-by-Value Returns
//!
//! The one real algorithm: per call, based on the return struct's size and
//! the platform's register-return policy, the dispatcher picks between
//! returning in registers (reinterpreting the register image as the struct's
//! bytes) and the hidden-output-pointer convention. The decision lives in
//! [`convention::decide_return_convention`] as an explicit, directly testable
//! function.
//!
//! # Failure Model
//!
//! Malformed descriptors fail before any native code runs. A null target is
//! not an error: it yields the zero value of the expected return kind,
//! untranslated, exactly as the native convention's sentinel would. Once a
//! call is dispatched it runs to completion synchronously.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod cif_cache;
pub mod convention;
pub mod descriptor;
pub mod dispatcher;
pub mod instrument;
pub mod symbols;

// Re-export commonly used items
pub use convention::{ReturnConvention, ReturnPolicy, decide_return_convention};
pub use descriptor::{
    ArgValue, CallDescriptor, RetKind, ReturnValue, ScalarKind, Selector, StructLayout,
    StructValue,
};
pub use dispatcher::Dispatcher;
pub use instrument::CallCounters;
pub use symbols::{Capability, NativeLibrary, SymbolError};
