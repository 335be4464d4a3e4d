//! The dispatcher: builds a call frame from a descriptor and invokes it.
//!
//! Arguments are staged into 8-byte cells (libffi reads each argument
//! through a pointer of its declared type), the CIF comes from the
//! per-thread signature cache, and the return value is read back out of an
//! aligned word buffer according to the descriptor's return kind.
//!
//! # Hot Path
//!
//! For a warmed signature a dispatch is: validate, stage cells, one hash
//! lookup, `ffi_call`. No locks are taken and the only allocation is the
//! cell arena when the argument list outgrows its inline capacity.

use crate::cif_cache::{self, SigKey, TypeKey};
use crate::convention::{ReturnConvention, ReturnPolicy, decide_return_convention};
use crate::descriptor::{ArgValue, CallDescriptor, RetKind, ReturnValue};
use libffi::raw;
use smallvec::SmallVec;
use std::os::raw::c_void;
use tether_core::DispatchError;

// =============================================================================
// Argument Staging
// =============================================================================

/// 8-byte cells a single argument occupies in the staging arena.
#[inline]
fn cells_for(arg: &ArgValue) -> usize {
    match arg {
        ArgValue::Struct(sv) => sv.layout().size().div_ceil(8).max(1),
        _ => 1,
    }
}

/// Copy an argument's object representation to the front of its cell span.
///
/// libffi reads exactly the declared type's size through the cell pointer,
/// so each value must start at the cell base regardless of width.
fn stage(cells: &mut [u64], offset: usize, arg: &ArgValue) {
    let bytes: SmallVec<[u8; 32]> = match arg {
        ArgValue::Int(v) => SmallVec::from_slice(&v.to_ne_bytes()),
        ArgValue::Int32(v) => SmallVec::from_slice(&v.to_ne_bytes()),
        ArgValue::Float(v) => SmallVec::from_slice(&v.to_ne_bytes()),
        ArgValue::Float32(v) => SmallVec::from_slice(&v.to_ne_bytes()),
        ArgValue::Ptr(v) => SmallVec::from_slice(&v.to_ne_bytes()),
        ArgValue::Struct(sv) => SmallVec::from_slice(sv.bytes()),
    };
    let dst = cells[offset..].as_mut_ptr().cast::<u8>();
    // Safety: the arena was sized so that `offset` leaves at least
    // `cells_for(arg) * 8 >= bytes.len()` bytes in bounds.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Dynamic call dispatcher with a fixed return policy.
///
/// Stateless apart from the policy; safe to share across threads (the CIF
/// cache is per-thread underneath).
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    policy: ReturnPolicy,
}

impl Dispatcher {
    /// Dispatcher with the compilation target's native return policy.
    pub fn new() -> Self {
        Self::with_policy(ReturnPolicy::native())
    }

    /// Dispatcher with an explicit return policy (tests exercise all three
    /// convention branches this way).
    pub fn with_policy(policy: ReturnPolicy) -> Self {
        Self { policy }
    }

    /// The policy this dispatcher decides struct returns under.
    #[inline]
    pub fn policy(&self) -> ReturnPolicy {
        self.policy
    }

    /// Invoke the call a descriptor describes.
    ///
    /// A null target yields the zero sentinel of the expected return kind;
    /// native lookup failures pass through untranslated, they are not
    /// errors at this layer.
    pub fn dispatch(&self, desc: &CallDescriptor) -> Result<ReturnValue, DispatchError> {
        desc.validate()?;

        if desc.target == 0 {
            return Ok(ReturnValue::zero(&desc.ret));
        }

        // Message sends pass the selector through unchanged as the second
        // argument, after the receiver.
        let selector_arg = desc.selector.map(|s| ArgValue::Ptr(s.raw()));
        let mut args: SmallVec<[&ArgValue; 8]> = SmallVec::new();
        match &selector_arg {
            Some(sel) => {
                args.push(&desc.args[0]);
                args.push(sel);
                args.extend(desc.args[1..].iter());
            }
            None => args.extend(desc.args.iter()),
        }

        match &desc.ret {
            RetKind::Void => {
                self.call(desc.target, &args, TypeKey::Void, 1);
                Ok(ReturnValue::Void)
            }
            RetKind::Int => {
                let word = self.call(desc.target, &args, TypeKey::I64, 1)[0];
                Ok(ReturnValue::Int(word as i64))
            }
            RetKind::Float => {
                let word = self.call(desc.target, &args, TypeKey::F64, 1)[0];
                Ok(ReturnValue::Float(f64::from_bits(word)))
            }
            RetKind::Ptr => {
                let word = self.call(desc.target, &args, TypeKey::Ptr, 1)[0];
                Ok(ReturnValue::Ptr(word as usize))
            }
            RetKind::Struct(layout) => {
                let size = layout.size();
                let convention = decide_return_convention(size, self.policy);
                match convention {
                    // Small integer-class structs come back as a single
                    // general-register image; the scalar entry point's
                    // return word carries the struct's bytes. Float-element
                    // structs return in SSE/vector registers on the 64-bit
                    // ABIs, so they must go through the structure-typed call
                    // even when they fit a word.
                    ReturnConvention::Register if size <= 8 && layout.is_integer_class() => {
                        let word = self.call(desc.target, &args, TypeKey::I64, 1)[0];
                        let mut bytes: SmallVec<[u8; 32]> = SmallVec::from_elem(0, size);
                        bytes.copy_from_slice(&word.to_ne_bytes()[..size]);
                        Ok(ReturnValue::Struct(bytes))
                    }
                    // Structure-typed call: libffi applies the platform's
                    // actual convention (register pair or hidden pointer)
                    // for the declared element layout.
                    _ => {
                        let words = size.div_ceil(8).max(1);
                        let buf = self.call(
                            desc.target,
                            &args,
                            TypeKey::for_layout(layout),
                            words,
                        );
                        let mut bytes: SmallVec<[u8; 32]> = SmallVec::from_elem(0, size);
                        for (i, chunk) in bytes.chunks_mut(8).enumerate() {
                            chunk.copy_from_slice(&buf[i].to_ne_bytes()[..chunk.len()]);
                        }
                        Ok(ReturnValue::Struct(bytes))
                    }
                }
            }
        }
    }

    /// Stage arguments, fetch the CIF, and perform the foreign call.
    ///
    /// Returns the word buffer the result was written into; `ret_words` must
    /// cover the declared return type's size (minimum one word; libffi
    /// widens sub-word integer returns to a full cell).
    fn call(
        &self,
        target: usize,
        args: &[&ArgValue],
        ret: TypeKey,
        ret_words: usize,
    ) -> SmallVec<[u64; 4]> {
        let key = SigKey {
            args: args.iter().map(|a| TypeKey::for_arg(a)).collect(),
            ret,
        };

        // Stage every argument into a fixed arena first; cell pointers must
        // stay stable while libffi reads through them.
        let total_cells: usize = args.iter().map(|a| cells_for(a)).sum();
        let mut cells: SmallVec<[u64; 16]> = SmallVec::from_elem(0, total_cells.max(1));
        let mut offsets: SmallVec<[usize; 8]> = SmallVec::new();
        let mut next = 0usize;
        for arg in args {
            offsets.push(next);
            stage(&mut cells, next, arg);
            next += cells_for(arg);
        }

        let base = cells.as_mut_ptr();
        let mut avalues: SmallVec<[*mut c_void; 8]> = offsets
            .iter()
            // Safety: every offset is within the arena sized above.
            .map(|&off| unsafe { base.add(off) }.cast::<c_void>())
            .collect();

        let mut ret_buf: SmallVec<[u64; 4]> = SmallVec::from_elem(0, ret_words.max(1));

        cif_cache::with_cif(key, |cif| {
            // Safety: the CIF was built from exactly these argument kinds,
            // each avalue points at a staged value of the declared type, the
            // return buffer covers the declared return size, and the target
            // is a live native entry point by the caller's contract.
            unsafe {
                let fun: unsafe extern "C" fn() = std::mem::transmute(target);
                raw::ffi_call(
                    cif.as_raw_ptr(),
                    Some(fun),
                    ret_buf.as_mut_ptr().cast::<c_void>(),
                    avalues.as_mut_ptr(),
                );
            }
        });

        ret_buf
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Selector, StructLayout, StructValue};
    use crate::descriptor::ScalarKind;

    extern "C" fn add3(a: i64, b: i64, c: i64) -> i64 {
        a + b + c
    }

    #[test]
    fn test_scalar_dispatch() {
        let dispatcher = Dispatcher::new();
        let desc = CallDescriptor::function(add3 as usize, RetKind::Int)
            .arg(ArgValue::Int(1))
            .arg(ArgValue::Int(2))
            .arg(ArgValue::Int(40));
        assert_eq!(dispatcher.dispatch(&desc).unwrap(), ReturnValue::Int(43));
    }

    #[test]
    fn test_null_target_yields_zero_sentinel() {
        let dispatcher = Dispatcher::new();
        let desc = CallDescriptor::function(0, RetKind::Ptr).arg(ArgValue::Int(5));
        assert_eq!(dispatcher.dispatch(&desc).unwrap(), ReturnValue::Ptr(0));
    }

    #[test]
    fn test_null_target_struct_return_is_zeroed() {
        let dispatcher = Dispatcher::new();
        let layout = StructLayout::new(&[ScalarKind::I64, ScalarKind::I64, ScalarKind::I64]).unwrap();
        let desc = CallDescriptor::function(0, RetKind::Struct(layout));
        let result = dispatcher.dispatch(&desc).unwrap();
        assert_eq!(result.as_struct_bytes().unwrap(), &[0u8; 24][..]);
    }

    extern "C" fn second_arg(_recv: usize, sel: usize) -> i64 {
        sel as i64
    }

    #[test]
    fn test_selector_passes_through_as_second_argument() {
        let dispatcher = Dispatcher::new();
        let desc = CallDescriptor::message(
            second_arg as usize,
            0xBEEF,
            Selector::from_raw(0x5E1),
            RetKind::Int,
        );
        assert_eq!(
            dispatcher.dispatch(&desc).unwrap(),
            ReturnValue::Int(0x5E1)
        );
    }

    extern "C" fn pair_sum(p: PairArg) -> i64 {
        p.a as i64 + p.b as i64
    }

    #[derive(Clone, Copy)]
    #[repr(C)]
    struct PairArg {
        a: i32,
        b: i32,
    }

    #[test]
    fn test_struct_by_value_argument() {
        let dispatcher = Dispatcher::new();
        let layout = StructLayout::new(&[ScalarKind::I32, ScalarKind::I32]).unwrap();
        let value = StructValue::from_native(layout, &PairArg { a: 30, b: 12 }).unwrap();
        let desc =
            CallDescriptor::function(pair_sum as usize, RetKind::Int).arg(ArgValue::Struct(value));
        assert_eq!(dispatcher.dispatch(&desc).unwrap(), ReturnValue::Int(42));
    }
}
