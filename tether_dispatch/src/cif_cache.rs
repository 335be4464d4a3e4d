//! Per-thread cache of libffi call interfaces.
//!
//! Building a CIF classifies every argument and return type against the
//! platform ABI; doing that once per distinct signature instead of once per
//! call keeps repeated dispatches cheap. CIFs hold raw pointers into their
//! own type descriptions, so the cache is thread-local rather than shared.

use crate::descriptor::{ArgValue, RetKind, ScalarKind, StructLayout};
use libffi::middle::{Cif, Type};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::RefCell;

// =============================================================================
// Signature Keys
// =============================================================================

/// Hashable stand-in for one libffi type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeKey {
    Void,
    I32,
    I64,
    F32,
    F64,
    Ptr,
    Struct(SmallVec<[ScalarKind; 8]>),
}

impl TypeKey {
    pub(crate) fn for_arg(arg: &ArgValue) -> Self {
        match arg {
            ArgValue::Int(_) => TypeKey::I64,
            ArgValue::Int32(_) => TypeKey::I32,
            ArgValue::Float(_) => TypeKey::F64,
            ArgValue::Float32(_) => TypeKey::F32,
            ArgValue::Ptr(_) => TypeKey::Ptr,
            ArgValue::Struct(sv) => TypeKey::for_layout(sv.layout()),
        }
    }

    pub(crate) fn for_ret(ret: &RetKind) -> Self {
        match ret {
            RetKind::Void => TypeKey::Void,
            RetKind::Int => TypeKey::I64,
            RetKind::Float => TypeKey::F64,
            RetKind::Ptr => TypeKey::Ptr,
            RetKind::Struct(layout) => TypeKey::for_layout(layout),
        }
    }

    pub(crate) fn for_layout(layout: &StructLayout) -> Self {
        TypeKey::Struct(SmallVec::from_slice(layout.elems()))
    }

    fn to_ffi_type(&self) -> Type {
        match self {
            TypeKey::Void => Type::void(),
            TypeKey::I32 => Type::i32(),
            TypeKey::I64 => Type::i64(),
            TypeKey::F32 => Type::f32(),
            TypeKey::F64 => Type::f64(),
            TypeKey::Ptr => Type::pointer(),
            TypeKey::Struct(elems) => Type::structure(elems.iter().map(|e| scalar_type(*e))),
        }
    }
}

fn scalar_type(kind: ScalarKind) -> Type {
    match kind {
        ScalarKind::I8 => Type::i8(),
        ScalarKind::I16 => Type::i16(),
        ScalarKind::I32 => Type::i32(),
        ScalarKind::I64 => Type::i64(),
        ScalarKind::F32 => Type::f32(),
        ScalarKind::F64 => Type::f64(),
        ScalarKind::Ptr => Type::pointer(),
    }
}

/// Full call signature: argument keys plus return key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SigKey {
    pub(crate) args: SmallVec<[TypeKey; 8]>,
    pub(crate) ret: TypeKey,
}

// =============================================================================
// Thread-Local Cache
// =============================================================================

thread_local! {
    static CIF_CACHE: RefCell<FxHashMap<SigKey, Cif>> = RefCell::new(FxHashMap::default());
}

/// Run `use_cif` against the cached CIF for `key`, building it on first use.
pub(crate) fn with_cif<R>(key: SigKey, use_cif: impl FnOnce(&Cif) -> R) -> R {
    CIF_CACHE.with(|cache| {
        let mut map = cache.borrow_mut();
        let cif = map.entry(key).or_insert_with_key(|k| {
            let args: Vec<Type> = k.args.iter().map(|a| a.to_ffi_type()).collect();
            Cif::new(args, k.ret.to_ffi_type())
        });
        use_cif(cif)
    })
}

/// Number of distinct signatures cached on this thread (test visibility).
#[cfg(test)]
pub(crate) fn cached_signatures() -> usize {
    CIF_CACHE.with(|cache| cache.borrow().len())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn int_sig(arg_count: usize) -> SigKey {
        SigKey {
            args: std::iter::repeat(TypeKey::I64).take(arg_count).collect(),
            ret: TypeKey::I64,
        }
    }

    #[test]
    fn test_same_signature_built_once() {
        let before = cached_signatures();
        with_cif(int_sig(6), |_| ());
        with_cif(int_sig(6), |_| ());
        assert_eq!(cached_signatures(), before + 1);
    }

    #[test]
    fn test_distinct_signatures_distinct_entries() {
        let before = cached_signatures();
        with_cif(int_sig(4), |_| ());
        with_cif(int_sig(5), |_| ());
        assert_eq!(cached_signatures(), before + 2);
    }

    #[test]
    fn test_struct_keys_compare_by_elements() {
        let a = TypeKey::Struct(SmallVec::from_slice(&[ScalarKind::I32, ScalarKind::I32]));
        let b = TypeKey::Struct(SmallVec::from_slice(&[ScalarKind::I32, ScalarKind::I32]));
        let c = TypeKey::Struct(SmallVec::from_slice(&[ScalarKind::I64]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
