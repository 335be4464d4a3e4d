//! Call descriptors: the shape of one dynamic native invocation.
//!
//! A descriptor is created fresh per call and never retained. It carries the
//! target address, an optional opaque selector (message sends), the ordered
//! argument list with per-argument kind tags, and the expected return kind.
//!
//! Integer-like arguments and returns travel at full register width; the
//! call site performs any deliberate narrowing, mirroring how the marshaler
//! treats managed field widths.

use smallvec::SmallVec;
use tether_core::DispatchError;

/// Maximum struct-by-value arguments per call.
///
/// The original layer's generated signatures never exceeded three; the
/// dispatcher keeps the same bound as a descriptor-validity check.
pub const MAX_STRUCT_ARGS: usize = 3;

// =============================================================================
// Scalar Kinds and Struct Layouts
// =============================================================================

/// Element kind inside a struct-by-value layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Ptr,
}

impl ScalarKind {
    /// Size in bytes.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            ScalarKind::I8 => 1,
            ScalarKind::I16 => 2,
            ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::F64 => 8,
            ScalarKind::Ptr => std::mem::size_of::<usize>(),
        }
    }

    /// Natural alignment in bytes (equal to size for these kinds).
    #[inline]
    pub fn align(self) -> usize {
        self.size()
    }
}

/// Element layout of a struct passed or returned by value.
///
/// The element list is what the ABI classifies on; size and alignment follow
/// the C struct layout rules for the declared elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructLayout {
    elems: SmallVec<[ScalarKind; 8]>,
}

impl StructLayout {
    /// Build a layout from its element kinds.
    pub fn new(elems: &[ScalarKind]) -> Result<Self, DispatchError> {
        if elems.is_empty() {
            return Err(DispatchError::EmptyStructLayout);
        }
        Ok(Self {
            elems: SmallVec::from_slice(elems),
        })
    }

    /// Element kinds in declaration order.
    #[inline]
    pub fn elems(&self) -> &[ScalarKind] {
        &self.elems
    }

    /// Whether every element is integer-like (no float members).
    ///
    /// Integer-class structs of a word or less come back in a general
    /// register; a float element moves the return into SSE/vector registers
    /// on the 64-bit ABIs, which rules out scalar reinterpretation.
    pub fn is_integer_class(&self) -> bool {
        self.elems
            .iter()
            .all(|e| !matches!(e, ScalarKind::F32 | ScalarKind::F64))
    }

    /// Struct alignment: the largest element alignment.
    pub fn align(&self) -> usize {
        self.elems.iter().map(|e| e.align()).max().unwrap_or(1)
    }

    /// Struct size with C padding rules, including tail padding.
    pub fn size(&self) -> usize {
        let mut offset = 0usize;
        for elem in &self.elems {
            let align = elem.align();
            offset = (offset + align - 1) & !(align - 1);
            offset += elem.size();
        }
        let align = self.align();
        (offset + align - 1) & !(align - 1)
    }
}

// =============================================================================
// Argument and Return Values
// =============================================================================

/// One struct-by-value argument: layout plus raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    layout: StructLayout,
    bytes: SmallVec<[u8; 32]>,
}

impl StructValue {
    /// Wrap raw struct bytes with their layout. The byte length must match
    /// the layout's size exactly.
    pub fn new(layout: StructLayout, bytes: &[u8]) -> Result<Self, DispatchError> {
        if bytes.len() != layout.size() {
            return Err(DispatchError::StructSizeMismatch {
                expected: layout.size(),
                found: bytes.len(),
            });
        }
        Ok(Self {
            layout,
            bytes: SmallVec::from_slice(bytes),
        })
    }

    /// Build from a `#[repr(C)]` value whose layout `layout` describes.
    pub fn from_native<T: Copy>(layout: StructLayout, value: &T) -> Result<Self, DispatchError> {
        let size = std::mem::size_of::<T>();
        // Safety: T is a Copy repr(C) value; we only read its object
        // representation.
        let bytes = unsafe { std::slice::from_raw_parts((value as *const T).cast::<u8>(), size) };
        Self::new(layout, bytes)
    }

    #[inline]
    pub fn layout(&self) -> &StructLayout {
        &self.layout
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One argument with its kind tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Integer-like, at register width; the callee's declared width governs
    /// how many low bytes are meaningful.
    Int(i64),
    /// 32-bit integer passed with its exact width.
    Int32(i32),
    Float(f64),
    Float32(f32),
    Ptr(usize),
    Struct(StructValue),
}

impl ArgValue {
    /// Whether this argument is a struct passed by value.
    #[inline]
    pub fn is_struct(&self) -> bool {
        matches!(self, ArgValue::Struct(_))
    }
}

/// Expected return kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RetKind {
    Void,
    /// Integer-like at register width.
    Int,
    Float,
    Ptr,
    /// Struct returned by value, with its element layout.
    Struct(StructLayout),
}

/// Result of one dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Void,
    Int(i64),
    Float(f64),
    Ptr(usize),
    Struct(SmallVec<[u8; 32]>),
}

impl ReturnValue {
    /// Zero/null sentinel of the given return kind.
    ///
    /// This is what a call against an unresolved (null) target yields: the
    /// same sentinel the native convention itself uses for failure.
    pub fn zero(ret: &RetKind) -> Self {
        match ret {
            RetKind::Void => ReturnValue::Void,
            RetKind::Int => ReturnValue::Int(0),
            RetKind::Float => ReturnValue::Float(0.0),
            RetKind::Ptr => ReturnValue::Ptr(0),
            RetKind::Struct(layout) => {
                ReturnValue::Struct(SmallVec::from_elem(0, layout.size()))
            }
        }
    }

    /// Struct bytes, when this is a struct return.
    pub fn as_struct_bytes(&self) -> Option<&[u8]> {
        match self {
            ReturnValue::Struct(bytes) => Some(bytes),
            _ => None,
        }
    }
}

// =============================================================================
// Selector and Call Descriptor
// =============================================================================

/// Opaque operation identifier for message sends.
///
/// The dispatcher passes it through unchanged as the second argument, after
/// the receiver; it never inspects or translates the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selector(usize);

impl Selector {
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Selector(raw)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// One dynamic invocation: target, optional selector, arguments, return kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    pub target: usize,
    pub selector: Option<Selector>,
    pub args: SmallVec<[ArgValue; 8]>,
    pub ret: RetKind,
}

impl CallDescriptor {
    /// Plain function call descriptor.
    pub fn function(target: usize, ret: RetKind) -> Self {
        Self {
            target,
            selector: None,
            args: SmallVec::new(),
            ret,
        }
    }

    /// Message-send descriptor: `receiver` becomes the first argument and
    /// the selector the second.
    pub fn message(target: usize, receiver: usize, selector: Selector, ret: RetKind) -> Self {
        let mut args = SmallVec::new();
        args.push(ArgValue::Ptr(receiver));
        Self {
            target,
            selector: Some(selector),
            args,
            ret,
        }
    }

    /// Append an argument.
    pub fn arg(mut self, value: ArgValue) -> Self {
        self.args.push(value);
        self
    }

    /// Number of struct-by-value arguments.
    pub fn struct_arg_count(&self) -> usize {
        self.args.iter().filter(|a| a.is_struct()).count()
    }

    /// Validate descriptor shape before dispatch.
    pub fn validate(&self) -> Result<(), DispatchError> {
        let struct_args = self.struct_arg_count();
        if struct_args > MAX_STRUCT_ARGS {
            return Err(DispatchError::TooManyStructArgs {
                count: struct_args,
                max: MAX_STRUCT_ARGS,
            });
        }
        if self.selector.is_some() && self.args.is_empty() {
            return Err(DispatchError::MissingReceiver);
        }
        if let RetKind::Struct(layout) = &self.ret {
            if layout.elems().is_empty() {
                return Err(DispatchError::EmptyStructLayout);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_size_applies_c_padding() {
        // { i8, i32 } pads to 8 with alignment 4... i8 at 0, i32 at 4.
        let layout = StructLayout::new(&[ScalarKind::I8, ScalarKind::I32]).unwrap();
        assert_eq!(layout.size(), 8);
        assert_eq!(layout.align(), 4);
    }

    #[test]
    fn test_layout_tail_padding() {
        // { i64, i8 } pads the tail to 16.
        let layout = StructLayout::new(&[ScalarKind::I64, ScalarKind::I8]).unwrap();
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn test_integer_class_excludes_float_elements() {
        let ints = StructLayout::new(&[ScalarKind::I32, ScalarKind::I32]).unwrap();
        assert!(ints.is_integer_class());
        let floats = StructLayout::new(&[ScalarKind::F32, ScalarKind::F32]).unwrap();
        assert!(!floats.is_integer_class());
        let mixed = StructLayout::new(&[ScalarKind::I32, ScalarKind::F32]).unwrap();
        assert!(!mixed.is_integer_class());
    }

    #[test]
    fn test_empty_layout_rejected() {
        assert!(matches!(
            StructLayout::new(&[]),
            Err(DispatchError::EmptyStructLayout)
        ));
    }

    #[test]
    fn test_struct_value_length_checked() {
        let layout = StructLayout::new(&[ScalarKind::I32, ScalarKind::I32]).unwrap();
        assert!(StructValue::new(layout.clone(), &[0u8; 8]).is_ok());
        assert!(StructValue::new(layout, &[0u8; 4]).is_err());
    }

    #[test]
    fn test_too_many_struct_args_rejected() {
        let layout = StructLayout::new(&[ScalarKind::I32]).unwrap();
        let sv = StructValue::new(layout, &[0u8; 4]).unwrap();
        let mut desc = CallDescriptor::function(0x1000, RetKind::Void);
        for _ in 0..4 {
            desc = desc.arg(ArgValue::Struct(sv.clone()));
        }
        assert!(matches!(
            desc.validate(),
            Err(DispatchError::TooManyStructArgs { count: 4, max: 3 })
        ));
    }

    #[test]
    fn test_selector_requires_receiver() {
        let desc = CallDescriptor {
            target: 0x1000,
            selector: Some(Selector::from_raw(7)),
            args: SmallVec::new(),
            ret: RetKind::Void,
        };
        assert_eq!(desc.validate(), Err(DispatchError::MissingReceiver));
    }

    #[test]
    fn test_zero_return_matches_kind() {
        let layout = StructLayout::new(&[ScalarKind::I64, ScalarKind::I64, ScalarKind::I64]).unwrap();
        match ReturnValue::zero(&RetKind::Struct(layout)) {
            ReturnValue::Struct(bytes) => assert_eq!(bytes.len(), 24),
            other => panic!("unexpected return value {other:?}"),
        }
        assert_eq!(ReturnValue::zero(&RetKind::Int), ReturnValue::Int(0));
    }
}
