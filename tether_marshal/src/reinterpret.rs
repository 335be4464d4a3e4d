//! Byte-level reinterpretation for union-like native layouts.
//!
//! Several native event structs overlay differently-typed payloads in the
//! same storage, discriminated by a tag field. The marshalers model that
//! storage as a plain byte array and reinterpret it through these helpers.
//!
//! Only plain-old-data types may pass through here: `#[repr(C)]`, `Copy`,
//! no padding-sensitive reads beyond the payload's own size.

/// Copy a POD value into the front of a byte buffer.
///
/// The buffer must be at least `size_of::<T>()` bytes; trailing bytes are
/// left untouched (they belong to a larger overlay variant).
#[inline]
pub fn store<T: Copy>(value: &T, bytes: &mut [u8]) {
    let size = std::mem::size_of::<T>();
    assert!(bytes.len() >= size, "overlay buffer too small for payload");
    // Safety: T is Copy POD by contract, source and destination do not
    // overlap, and the destination holds at least `size` bytes.
    unsafe {
        std::ptr::copy_nonoverlapping(
            (value as *const T).cast::<u8>(),
            bytes.as_mut_ptr(),
            size,
        );
    }
}

/// Reinterpret the front of a byte buffer as a POD value.
#[inline]
pub fn load<T: Copy>(bytes: &[u8]) -> T {
    let size = std::mem::size_of::<T>();
    assert!(bytes.len() >= size, "overlay buffer too small for payload");
    // Safety: T is Copy POD by contract and the source holds at least
    // `size` bytes. read_unaligned tolerates the buffer's u8 alignment.
    unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<T>()) }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    #[repr(C)]
    struct Pair {
        a: i16,
        b: i16,
    }

    #[test]
    fn test_store_load_round_trip() {
        let mut buf = [0u8; 8];
        let pair = Pair { a: -3, b: 900 };
        store(&pair, &mut buf);
        assert_eq!(load::<Pair>(&buf), pair);
    }

    #[test]
    fn test_store_leaves_tail_untouched() {
        let mut buf = [0xAAu8; 8];
        store(&Pair { a: 0, b: 0 }, &mut buf);
        assert_eq!(&buf[4..], &[0xAA; 4]);
    }
}
