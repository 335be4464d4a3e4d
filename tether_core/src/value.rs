//! Typed field values with deliberate narrowing and widening.
//!
//! A managed field holds one scalar. The marshaler decides the native width
//! at each call site, so integer conversions here are total: a managed 32-bit
//! field written into a pointer-sized native slot zero-or-sign-extends, and a
//! pointer-sized native value written back into a 32-bit managed field
//! truncates. Both directions are intentional platform behavior, not errors.
//!
//! The only conversion that *is* an error is asking an integer accessor for a
//! float field (or vice versa): that means the generated marshaler and the
//! managed class have drifted out of sync, which is a binding mismatch.

use crate::error::MarshalError;

// =============================================================================
// Field Kind
// =============================================================================

/// Scalar kind tag for a managed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Pointer-sized integer (native handles, addresses).
    Ptr,
}

impl FieldKind {
    /// Whether this kind stores an integer-like payload.
    #[inline]
    pub fn is_integer(self) -> bool {
        !matches!(self, FieldKind::F32 | FieldKind::F64)
    }
}

// =============================================================================
// Field Value
// =============================================================================

/// One managed field's scalar payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Ptr(usize),
}

impl FieldValue {
    /// Kind tag for this value.
    #[inline]
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::I16(_) => FieldKind::I16,
            FieldValue::I32(_) => FieldKind::I32,
            FieldValue::I64(_) => FieldKind::I64,
            FieldValue::F32(_) => FieldKind::F32,
            FieldValue::F64(_) => FieldKind::F64,
            FieldValue::Ptr(_) => FieldKind::Ptr,
        }
    }

    /// Zero value of the given kind.
    #[inline]
    pub fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Bool => FieldValue::Bool(false),
            FieldKind::I16 => FieldValue::I16(0),
            FieldKind::I32 => FieldValue::I32(0),
            FieldKind::I64 => FieldValue::I64(0),
            FieldKind::F32 => FieldValue::F32(0.0),
            FieldKind::F64 => FieldValue::F64(0.0),
            FieldKind::Ptr => FieldValue::Ptr(0),
        }
    }

    // -------------------------------------------------------------------------
    // Integer accessors (widening)
    // -------------------------------------------------------------------------

    /// Widen to `i64`. Errors on float payloads (binding mismatch).
    #[inline]
    pub fn as_i64(&self) -> Result<i64, MarshalError> {
        match *self {
            FieldValue::Bool(v) => Ok(v as i64),
            FieldValue::I16(v) => Ok(v as i64),
            FieldValue::I32(v) => Ok(v as i64),
            FieldValue::I64(v) => Ok(v),
            FieldValue::Ptr(v) => Ok(v as i64),
            FieldValue::F32(_) | FieldValue::F64(_) => Err(MarshalError::KindMismatch {
                expected: "integer",
                found: "float",
            }),
        }
    }

    /// Narrow to `i32`. Truncation of wider payloads is deliberate.
    #[inline]
    pub fn as_i32(&self) -> Result<i32, MarshalError> {
        Ok(self.as_i64()? as i32)
    }

    /// Narrow to `i16`. Truncation of wider payloads is deliberate.
    #[inline]
    pub fn as_i16(&self) -> Result<i16, MarshalError> {
        Ok(self.as_i64()? as i16)
    }

    /// Reinterpret as a pointer-sized unsigned integer.
    ///
    /// A managed 32-bit handle stored into a 64-bit native slot extends here;
    /// this is the platform-specific widening the original layer performs.
    #[inline]
    pub fn as_ptr_sized(&self) -> Result<usize, MarshalError> {
        Ok(self.as_i64()? as usize)
    }

    /// Truthiness of an integer payload.
    #[inline]
    pub fn as_bool(&self) -> Result<bool, MarshalError> {
        Ok(self.as_i64()? != 0)
    }

    // -------------------------------------------------------------------------
    // Float accessors
    // -------------------------------------------------------------------------

    /// Widen to `f64`. Errors on integer payloads (binding mismatch).
    #[inline]
    pub fn as_f64(&self) -> Result<f64, MarshalError> {
        match *self {
            FieldValue::F32(v) => Ok(v as f64),
            FieldValue::F64(v) => Ok(v),
            _ => Err(MarshalError::KindMismatch {
                expected: "float",
                found: "integer",
            }),
        }
    }

    /// Narrow to `f32`. Precision loss is deliberate.
    #[inline]
    pub fn as_f32(&self) -> Result<f32, MarshalError> {
        Ok(self.as_f64()? as f32)
    }
}

// =============================================================================
// Tests
// =============================================================================
