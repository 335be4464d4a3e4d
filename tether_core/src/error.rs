//! Shared error types for the interop core.
//!
//! Two disjoint failure families, deliberately never merged:
//!
//! - [`MarshalError`]: binding mismatches between a generated marshaler and
//!   the managed class it was generated against. Fatal to the operation;
//!   there is no runtime recovery from a drifted binding.
//! - [`DispatchError`]: descriptor-shape problems detected before any native
//!   code runs. Native call *failures* are not errors at this layer: they
//!   surface as whatever sentinel the native convention uses and pass through
//!   untranslated.

use std::fmt;

// =============================================================================
// Marshal Errors
// =============================================================================

/// Binding mismatch between a struct marshaler and a managed class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// The managed class is missing a field the native layout requires.
    ///
    /// Resolution aborts and nothing is cached for the type: the cache
    /// becomes fully valid or stays unresolved, never half-populated.
    MissingField {
        struct_name: &'static str,
        class_name: String,
        field: &'static str,
    },

    /// A field's declared kind disagrees with what the marshaler reads.
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalError::MissingField {
                struct_name,
                class_name,
                field,
            } => write!(
                f,
                "managed class '{class_name}' has no field '{field}' required by native struct '{struct_name}'"
            ),
            MarshalError::KindMismatch { expected, found } => {
                write!(f, "field kind mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for MarshalError {}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Malformed call descriptor, detected before the native call is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A selector was supplied but the argument list has no receiver.
    MissingReceiver,

    /// More struct-by-value arguments than the dispatcher supports.
    TooManyStructArgs { count: usize, max: usize },

    /// A struct argument or return type with no elements.
    EmptyStructLayout,

    /// Struct bytes whose length disagrees with the declared layout.
    StructSizeMismatch { expected: usize, found: usize },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::MissingReceiver => {
                write!(f, "message send requires a receiver as the first argument")
            }
            DispatchError::TooManyStructArgs { count, max } => {
                write!(f, "{count} struct-by-value arguments exceeds the supported maximum of {max}")
            }
            DispatchError::EmptyStructLayout => {
                write!(f, "struct-by-value layout must have at least one element")
            }
            DispatchError::StructSizeMismatch { expected, found } => {
                write!(f, "struct value is {found} bytes but its layout requires {expected}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

// =============================================================================
// Tests
// =============================================================================
