//! Byte sets backed by a 256-bit bitmap

use std::fmt::{Debug, Formatter};

/// Set of byte values, used by the single-byte set matchers and by the
/// construction-time validation of literal arguments.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CharSet {
    bitmap: [u64; 4],
}

impl CharSet {
    /// The empty set
    #[must_use]
    pub const fn empty() -> Self {
        Self { bitmap: [0; 4] }
    }

    /// Every byte contained in `bytes`
    #[must_use]
    pub const fn from_bytes(bytes: &[u8]) -> Self {
        let mut bitmap = [0u64; 4];
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            bitmap[(b / 64) as usize] |= 1u64 << (b % 64);
            i += 1;
        }
        Self { bitmap }
    }

    /// Every byte in `lo..=hi`; empty when `lo > hi`.
    #[must_use]
    pub const fn from_range(lo: u8, hi: u8) -> Self {
        let mut bitmap = [0u64; 4];
        let mut c = lo as u16;
        while c <= hi as u16 {
            bitmap[(c / 64) as usize] |= 1u64 << (c % 64);
            c += 1;
        }
        Self { bitmap }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bitmap: [
                self.bitmap[0] | other.bitmap[0],
                self.bitmap[1] | other.bitmap[1],
                self.bitmap[2] | other.bitmap[2],
                self.bitmap[3] | other.bitmap[3],
            ],
        }
    }

    #[must_use]
    pub const fn complement(self) -> Self {
        Self {
            bitmap: [
                !self.bitmap[0],
                !self.bitmap[1],
                !self.bitmap[2],
                !self.bitmap[3],
            ],
        }
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, b: u8) -> bool {
        self.bitmap[(b / 64) as usize] & (1u64 << (b % 64)) != 0
    }

    /// Returns the offset of the first byte of `bytes` not in the set.
    #[must_use]
    pub fn first_outside(&self, bytes: &[u8]) -> Option<usize> {
        bytes.iter().position(|&b| !self.contains(b))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bitmap == [0; 4]
    }
}

impl Debug for CharSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut chars = String::new();
        for c in 0u8..=255 {
            if self.contains(c) {
                if c.is_ascii_graphic() {
                    chars.push(c as char);
                } else {
                    chars.push_str(&format!("\\x{:02x}", c));
                }
            }
            if chars.len() > 40 {
                chars.push_str("...");
                break;
            }
        }
        write!(f, "[{}]", chars)
    }
}
