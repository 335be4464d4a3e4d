//! Struct-return convention selection.
//!
//! A native function returning a small struct either leaves it in registers
//! or writes it through a hidden pointer supplied by the caller. Which one
//! applies depends on the struct's size relative to the platform's
//! register-return threshold, and some build targets disable register return
//! entirely. The decision is evaluated per call from the specific return
//! struct's size, so different call sites take different branches.
//!
//! Keeping the decision as a plain function over a runtime policy value (not
//! conditional compilation) makes all three branches testable on any host.

// =============================================================================
// Return Policy
// =============================================================================

/// Platform register-return policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnPolicy {
    /// Largest struct, in bytes, the ABI returns in registers.
    pub threshold: usize,
    /// Whether register return is available at all for this build.
    pub enabled: bool,
}

impl ReturnPolicy {
    /// Policy with an explicit threshold.
    #[inline]
    pub const fn new(threshold: usize, enabled: bool) -> Self {
        Self { threshold, enabled }
    }

    /// Policy that forces the hidden-pointer convention for every struct.
    #[inline]
    pub const fn disabled() -> Self {
        Self {
            threshold: 0,
            enabled: false,
        }
    }

    /// Default policy for the compilation target.
    #[inline]
    pub const fn native() -> Self {
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        {
            Self::new(16, true)
        }
        #[cfg(target_arch = "x86")]
        {
            Self::new(8, true)
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "x86")))]
        {
            Self::disabled()
        }
    }
}

impl Default for ReturnPolicy {
    fn default() -> Self {
        Self::native()
    }
}

// =============================================================================
// Convention Tag
// =============================================================================

/// Selected struct-return convention for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnConvention {
    /// Struct fits in registers; the register image is the struct's bytes.
    Register,
    /// Struct exceeds the threshold; hidden output pointer.
    IndirectOversize,
    /// Register return disabled for this build; hidden output pointer.
    IndirectForced,
}

impl ReturnConvention {
    /// Whether the call goes through the hidden-output-pointer variant.
    #[inline]
    pub fn is_indirect(self) -> bool {
        !matches!(self, ReturnConvention::Register)
    }
}

/// Select the struct-return convention for a return struct of `struct_size`
/// bytes under `policy`.
///
/// The three-way branch, in order:
/// 1. register return disabled for the build: always indirect;
/// 2. size exceeds the threshold: indirect;
/// 3. otherwise: register return.
#[inline]
pub fn decide_return_convention(struct_size: usize, policy: ReturnPolicy) -> ReturnConvention {
    if !policy.enabled {
        ReturnConvention::IndirectForced
    } else if struct_size > policy.threshold {
        ReturnConvention::IndirectOversize
    } else {
        ReturnConvention::Register
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversize_struct_goes_indirect() {
        // 24-byte struct against a 16-byte threshold: never registers.
        let convention = decide_return_convention(24, ReturnPolicy::new(16, true));
        assert_eq!(convention, ReturnConvention::IndirectOversize);
        assert!(convention.is_indirect());
    }

    #[test]
    fn test_small_struct_uses_registers() {
        assert_eq!(
            decide_return_convention(8, ReturnPolicy::new(16, true)),
            ReturnConvention::Register
        );
        assert_eq!(
            decide_return_convention(16, ReturnPolicy::new(16, true)),
            ReturnConvention::Register
        );
    }

    #[test]
    fn test_disabled_policy_forces_indirect_for_any_size() {
        for size in [1, 4, 8, 16, 64] {
            assert_eq!(
                decide_return_convention(size, ReturnPolicy::disabled()),
                ReturnConvention::IndirectForced
            );
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let policy = ReturnPolicy::new(16, true);
        assert_eq!(
            decide_return_convention(16, policy),
            ReturnConvention::Register
        );
        assert_eq!(
            decide_return_convention(17, policy),
            ReturnConvention::IndirectOversize
        );
    }
}
