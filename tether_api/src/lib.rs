//! Instrumented wrappers over the marshal and dispatch layers.
//!
//! The original layer carried thousands of mechanically identical per-symbol
//! entry points; this crate keeps a representative sample of that fan-out.
//! Every wrapper follows the same shape:
//!
//! 1. bump its call counter slot,
//! 2. probe the symbol capability (cached after first use),
//! 3. build a [`CallDescriptor`] and dispatch.
//!
//! A missing symbol is not an error: the capability resolves to a null
//! target and the dispatch yields the zero sentinel of the return kind, so
//! callers degrade exactly as they would against an older native library.
//!
//! # Exclusion Switches
//!
//! Each wrapper sits behind a `exclude-<symbol>` cargo feature that compiles
//! it out entirely, probe and counter slot use included. The counter
//! snapshot is what identifies exclusion candidates: wrappers whose slot
//! stays zero across a representative workload.

#![deny(unsafe_op_in_unsafe_fn)]

use std::fmt;

use tether_core::{DispatchError, ManagedObject, MarshalError};
use tether_dispatch::{
    ArgValue, CallCounters, CallDescriptor, Dispatcher, NativeLibrary, RetKind, ReturnValue,
    ScalarKind, StructLayout, StructValue,
};
use tether_marshal::{MarshalContext, PointMarshal, StructMarshal};

// =============================================================================
// Entry-Point Identifiers
// =============================================================================

pub const EP_LABS: usize = 0;
pub const EP_STRLEN: usize = 1;
pub const EP_DIV: usize = 2;
pub const EP_LDIV: usize = 3;
pub const EP_POINT_SINK: usize = 4;

/// Number of counter slots; one per wrapper, excluded wrappers included so
/// ids stay stable across feature combinations.
pub const ENTRY_POINT_COUNT: usize = 5;

// =============================================================================
// Errors
// =============================================================================

/// Failure surfaced by a wrapper: either a binding mismatch while marshaling
/// an argument, or a malformed descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Marshal(MarshalError),
    Dispatch(DispatchError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Marshal(e) => write!(f, "marshal error: {e}"),
            ApiError::Dispatch(e) => write!(f, "dispatch error: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<MarshalError> for ApiError {
    fn from(e: MarshalError) -> Self {
        ApiError::Marshal(e)
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        ApiError::Dispatch(e)
    }
}

// =============================================================================
// Api
// =============================================================================

/// One bound native library plus the shared machinery its wrappers use.
pub struct Api {
    library: NativeLibrary,
    dispatcher: Dispatcher,
    marshal: MarshalContext,
    counters: CallCounters,
}

impl Api {
    /// Bind wrappers against an already-opened library.
    pub fn new(library: NativeLibrary) -> Self {
        Self {
            library,
            dispatcher: Dispatcher::new(),
            marshal: MarshalContext::new(),
            counters: CallCounters::new(ENTRY_POINT_COUNT),
        }
    }

    /// Bind wrappers against the current process image.
    pub fn current_process() -> Self {
        Self::new(NativeLibrary::current())
    }

    #[inline]
    pub fn counters(&self) -> &CallCounters {
        &self.counters
    }

    #[inline]
    pub fn marshal(&self) -> &MarshalContext {
        &self.marshal
    }

    #[inline]
    pub fn library(&self) -> &NativeLibrary {
        &self.library
    }

    /// Marshal a managed object into a struct-by-value argument. The layout
    /// describes the marshaler's native type; the marshal layer is a byte
    /// producer and stays ignorant of calling conventions.
    #[cfg(not(feature = "exclude-point-sink"))]
    fn struct_arg<M: StructMarshal>(
        &self,
        layout: StructLayout,
        obj: &ManagedObject,
    ) -> Result<ArgValue, ApiError> {
        let native = self.marshal.read::<M>(obj)?;
        let value = StructValue::from_native(layout, &native)?;
        Ok(ArgValue::Struct(value))
    }

    // =========================================================================
    // Wrappers
    // =========================================================================

    #[cfg(not(feature = "exclude-labs"))]
    pub fn labs(&self, n: i64) -> Result<i64, ApiError> {
        self.counters.record(EP_LABS);
        let target = self.library.capability("labs").address_or_null();
        let desc = CallDescriptor::function(target, RetKind::Int).arg(ArgValue::Int(n));
        Ok(as_int(self.dispatcher.dispatch(&desc)?))
    }

    /// # Safety
    ///
    /// `s` must point to a NUL-terminated string valid for the duration of
    /// the call.
    #[cfg(not(feature = "exclude-strlen"))]
    pub unsafe fn strlen(&self, s: *const u8) -> Result<usize, ApiError> {
        self.counters.record(EP_STRLEN);
        let target = self.library.capability("strlen").address_or_null();
        let desc =
            CallDescriptor::function(target, RetKind::Ptr).arg(ArgValue::Ptr(s as usize));
        Ok(as_ptr(self.dispatcher.dispatch(&desc)?))
    }

    /// Quotient and remainder via the native `div`, whose 8-byte `div_t`
    /// return exercises the register-return convention.
    #[cfg(not(feature = "exclude-div"))]
    pub fn div(&self, numer: i32, denom: i32) -> Result<(i32, i32), ApiError> {
        self.counters.record(EP_DIV);
        let target = self.library.capability("div").address_or_null();
        let layout = StructLayout::new(&[ScalarKind::I32, ScalarKind::I32])?;
        let desc = CallDescriptor::function(target, RetKind::Struct(layout))
            .arg(ArgValue::Int32(numer))
            .arg(ArgValue::Int32(denom));
        let ret = self.dispatcher.dispatch(&desc)?;
        let bytes = as_struct(&ret, 8);
        let quot = i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let rem = i32::from_ne_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok((quot, rem))
    }

    /// `ldiv` returns a 16-byte `ldiv_t`, sitting exactly on the register
    /// threshold of the 64-bit targets.
    #[cfg(not(feature = "exclude-ldiv"))]
    pub fn ldiv(&self, numer: i64, denom: i64) -> Result<(i64, i64), ApiError> {
        self.counters.record(EP_LDIV);
        let target = self.library.capability("ldiv").address_or_null();
        let layout = StructLayout::new(&[ScalarKind::I64, ScalarKind::I64])?;
        let desc = CallDescriptor::function(target, RetKind::Struct(layout))
            .arg(ArgValue::Int(numer))
            .arg(ArgValue::Int(denom));
        let ret = self.dispatcher.dispatch(&desc)?;
        let bytes = as_struct(&ret, 16);
        let mut quot = [0u8; 8];
        let mut rem = [0u8; 8];
        quot.copy_from_slice(&bytes[0..8]);
        rem.copy_from_slice(&bytes[8..16]);
        Ok((i64::from_ne_bytes(quot), i64::from_ne_bytes(rem)))
    }

    /// Pass a managed point to a native consumer by value.
    ///
    /// The symbol is optional in every shipped library revision, so this is
    /// also the wrapper that demonstrates capability-based degradation: when
    /// the probe misses, the call lands on the null target and returns the
    /// void sentinel.
    #[cfg(not(feature = "exclude-point-sink"))]
    pub fn point_sink(&self, point: &ManagedObject) -> Result<(), ApiError> {
        self.counters.record(EP_POINT_SINK);
        let target = self.library.capability("tether_point_sink").address_or_null();
        let layout = StructLayout::new(&[ScalarKind::I32, ScalarKind::I32])?;
        let arg = self.struct_arg::<PointMarshal>(layout, point)?;
        let desc = CallDescriptor::function(target, RetKind::Void).arg(arg);
        self.dispatcher.dispatch(&desc)?;
        Ok(())
    }
}

// Shape-narrowing helpers. The dispatcher returns the variant matching the
// descriptor's return kind; the fallback arms are unreachable and map to the
// zero sentinel.
fn as_int(ret: ReturnValue) -> i64 {
    match ret {
        ReturnValue::Int(v) => v,
        _ => 0,
    }
}

fn as_ptr(ret: ReturnValue) -> usize {
    match ret {
        ReturnValue::Ptr(v) => v,
        _ => 0,
    }
}

fn as_struct(ret: &ReturnValue, size: usize) -> &[u8] {
    match ret.as_struct_bytes() {
        Some(bytes) if bytes.len() == size => bytes,
        _ => &[0u8; 32][..size],
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{FieldKind, ManagedClass, ManagedObject};
    use tether_dispatch::Capability;

    fn point_object(x: i32, y: i32) -> ManagedObject {
        let class = ManagedClass::new("Point", &[("x", FieldKind::I32), ("y", FieldKind::I32)]);
        let mut obj = ManagedObject::new(class);
        assert!(obj.set_named("x", tether_core::FieldValue::I32(x)));
        assert!(obj.set_named("y", tether_core::FieldValue::I32(y)));
        obj
    }

    #[cfg(all(unix, not(feature = "exclude-labs")))]
    #[test]
    fn test_labs_through_wrapper() {
        let api = Api::current_process();
        assert_eq!(api.labs(-42).unwrap(), 42);
        assert_eq!(api.labs(7).unwrap(), 7);
    }

    #[cfg(all(unix, not(feature = "exclude-strlen")))]
    #[test]
    fn test_strlen_through_wrapper() {
        let api = Api::current_process();
        let s = b"tether\0";
        let len = unsafe { api.strlen(s.as_ptr()) }.unwrap();
        assert_eq!(len, 6);
    }

    #[cfg(all(unix, not(feature = "exclude-div")))]
    #[test]
    fn test_div_register_returned_struct() {
        let api = Api::current_process();
        assert_eq!(api.div(7, 2).unwrap(), (3, 1));
        assert_eq!(api.div(-9, 4).unwrap(), (-2, -1));
    }

    #[cfg(all(unix, not(feature = "exclude-ldiv")))]
    #[test]
    fn test_ldiv_threshold_sized_struct() {
        let api = Api::current_process();
        assert_eq!(api.ldiv(1_000_000_007, 3).unwrap(), (333_333_335, 2));
    }

    #[cfg(not(feature = "exclude-point-sink"))]
    #[test]
    fn test_missing_symbol_degrades_to_sentinel() {
        let api = Api::current_process();
        assert_eq!(
            api.library().capability("tether_point_sink"),
            Capability::Missing
        );
        // Marshaling still runs; the call lands on the null target.
        let point = point_object(3, 4);
        assert!(api.point_sink(&point).is_ok());
    }

    #[cfg(not(feature = "exclude-point-sink"))]
    #[test]
    fn test_counters_track_wrapper_entries() {
        let api = Api::current_process();
        api.counters().enable();
        let point = point_object(1, 2);
        api.point_sink(&point).unwrap();
        api.point_sink(&point).unwrap();
        assert_eq!(api.counters().count(EP_POINT_SINK), 2);
        assert_eq!(api.counters().count(EP_LABS), 0);
    }

    #[cfg(not(feature = "exclude-point-sink"))]
    #[test]
    fn test_counters_disabled_by_default() {
        let api = Api::current_process();
        let point = point_object(0, 0);
        api.point_sink(&point).unwrap();
        assert_eq!(api.counters().count(EP_POINT_SINK), 0);
    }

    #[cfg(not(feature = "exclude-point-sink"))]
    #[test]
    fn test_marshal_error_propagates_through_wrapper() {
        let api = Api::current_process();
        let class = ManagedClass::new("Point2", &[("x", FieldKind::I32)]);
        let obj = ManagedObject::new(class);
        match api.point_sink(&obj) {
            Err(ApiError::Marshal(MarshalError::MissingField { field, .. })) => {
                assert_eq!(field, "y");
            }
            other => panic!("expected missing-field error, got {other:?}"),
        }
    }
}
