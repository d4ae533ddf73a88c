//! Fixed-size capability bitmaps as returned by `EVIOCGBIT` / `EVIOCGPROP`.
//!
//! The kernel writes one bit per code, least-significant bit first inside
//! each byte: code `n` lives in byte `n / 8`, bit `n % 8`.  The buffer sizes
//! are part of the ABI, so each bitmap is a plain byte array whose length is
//! derived from the matching `*_CNT` constant.

use crate::abi::codes::{ABS_CNT, EV_CNT, INPUT_PROP_CNT, KEY_CNT};

/// Number of bytes needed to hold `bits` bits.
pub const fn bitmap_len(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// A capability bitmap backed by exactly `N` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap<const N: usize> {
    bytes: [u8; N],
}

/// Supported event types (`EV_*`).
pub type EventTypeBits = Bitmap<{ bitmap_len(EV_CNT) }>;
/// Supported absolute axes (`ABS_*`).
pub type AbsBits = Bitmap<{ bitmap_len(ABS_CNT) }>;
/// Supported keys and buttons (`KEY_*` / `BTN_*`).
pub type KeyBits = Bitmap<{ bitmap_len(KEY_CNT) }>;
/// Device properties (`INPUT_PROP_*`).
pub type PropBits = Bitmap<{ bitmap_len(INPUT_PROP_CNT) }>;

impl<const N: usize> Bitmap<N> {
    /// Number of codes this bitmap can describe.
    pub const BITS: usize = N * 8;

    /// An all-zero bitmap.
    pub const fn new() -> Self {
        Self { bytes: [0u8; N] }
    }

    /// Wraps a buffer filled in by the kernel.
    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// Raw bytes, in kernel layout.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Mutable raw bytes, handed to the kernel as the `ioctl` output buffer.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }

    /// Returns `true` if bit `index` is set.  Out-of-range indices are unset.
    pub fn is_set(&self, index: usize) -> bool {
        match self.bytes.get(index / 8) {
            Some(byte) => byte & (1 << (index % 8)) != 0,
            None => false,
        }
    }

    /// Sets bit `index`.  Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize) {
        if let Some(byte) = self.bytes.get_mut(index / 8) {
            *byte |= 1 << (index % 8);
        }
    }

    /// Iterates over the indices of all set bits in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::BITS).filter(move |&i| self.is_set(i))
    }
}

impl<const N: usize> Default for Bitmap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FromIterator<u16> for Bitmap<N> {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        for code in iter {
            bitmap.set(code as usize);
        }
        bitmap
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::codes::{ABS_MT_SLOT, ABS_MT_TRACKING_ID, BTN_TOUCH};

    #[test]
    fn test_bitmap_sizes_follow_kernel_counts() {
        assert_eq!(std::mem::size_of::<EventTypeBits>(), 4);
        assert_eq!(std::mem::size_of::<AbsBits>(), 8);
        assert_eq!(std::mem::size_of::<KeyBits>(), 96);
        assert_eq!(std::mem::size_of::<PropBits>(), 4);
    }

    #[test]
    fn test_is_set_reads_lsb_first_within_byte() {
        // Arrange: byte 5 bit 7 is code 0x2f (ABS_MT_SLOT)
        let mut raw = [0u8; 8];
        raw[5] = 0b1000_0000;
        let bits = AbsBits::from_bytes(raw);

        // Act / Assert
        assert!(bits.is_set(ABS_MT_SLOT as usize));
        assert!(!bits.is_set(ABS_MT_SLOT as usize - 1));
    }

    #[test]
    fn test_set_then_is_set() {
        let mut keys = KeyBits::new();
        keys.set(BTN_TOUCH as usize);
        assert!(keys.is_set(BTN_TOUCH as usize));
        assert_eq!(keys.iter_set().collect::<Vec<_>>(), vec![BTN_TOUCH as usize]);
    }

    #[test]
    fn test_out_of_range_index_is_never_set() {
        let mut bits = PropBits::new();
        bits.set(1_000);
        assert!(!bits.is_set(1_000));
        assert_eq!(bits, PropBits::new());
    }

    #[test]
    fn test_collect_from_codes() {
        let bits: AbsBits = [ABS_MT_SLOT, ABS_MT_TRACKING_ID].into_iter().collect();
        assert_eq!(
            bits.iter_set().collect::<Vec<_>>(),
            vec![ABS_MT_SLOT as usize, ABS_MT_TRACKING_ID as usize]
        );
    }
}
