//! Word-level byte-order remapping between how an emulator stores RAM and
//! how the emulated machine sees it.
//!
//! Some cores keep a big-endian machine's RAM as host-order 16-bit words, so
//! every pair of bytes is swapped relative to the addresses the game uses.
//! A [`MemoryOverlay`] decodes each `width`-byte word with the backing order
//! and re-encodes it with the real order (and back again for writes).

use std::ops::Range;

use crate::data_type::{DataType, MAX_WIDTH};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOverlay {
    width: usize,
    backing: DataType,
    real: DataType,
}

impl MemoryOverlay {
    /// `backing` and `real` are single endian tags (`=`, `<`, `>`); `width`
    /// is the word size in bytes and must be a power of two up to 8.
    pub fn new(backing: char, real: char, width: usize) -> Result<Self> {
        if !width.is_power_of_two() || width > MAX_WIDTH {
            return Err(Error::InvalidOverlay { width });
        }
        Ok(MemoryOverlay {
            width,
            backing: DataType::new(&format!("{backing}u{width}"))?,
            real: DataType::new(&format!("{real}u{width}"))?,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn backing(&self) -> &DataType {
        &self.backing
    }

    pub fn real(&self) -> &DataType {
        &self.real
    }

    /// True when parsing is a plain copy.
    pub fn is_identity(&self) -> bool {
        self.width == 1 || self.backing.resolved_endian() == self.real.resolved_endian()
    }

    /// Bytes of backing storage touched when transforming `size` bytes at
    /// `offset`: the range rounded out to whole words.
    pub fn span(&self, offset: usize, size: usize) -> Range<usize> {
        let start = offset & !(self.width - 1);
        let lead = offset - start;
        let len = (lead + size).div_ceil(self.width) * self.width;
        start..start + len
    }

    /// Convert the words covering `input[offset..offset + size]` into real
    /// order, writing them to the start of `out`. Returns the index in `out`
    /// of the byte that was at `offset`.
    ///
    /// Panics if `input` does not cover [`span`](Self::span) or `out` is
    /// shorter than it.
    pub fn parse(&self, input: &[u8], offset: usize, out: &mut [u8], size: usize) -> usize {
        let span = self.span(offset, size);
        for i in (0..span.len()).step_by(self.width) {
            let value = self.backing.decode(&input[span.start + i..]);
            self.real.encode(&mut out[i..], value);
        }
        offset - span.start
    }

    /// Mirror of [`parse`](Self::parse): convert real-order words at the
    /// start of `input` back into backing order inside `out`.
    pub fn unparse(&self, out: &mut [u8], offset: usize, input: &[u8], size: usize) {
        let span = self.span(offset, size);
        for i in (0..span.len()).step_by(self.width) {
            let value = self.real.decode(&input[i..]);
            self.backing.encode(&mut out[span.start + i..], value);
        }
    }
}

impl Default for MemoryOverlay {
    fn default() -> Self {
        MemoryOverlay {
            width: 1,
            backing: DataType::byte(),
            real: DataType::byte(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_width() {
        assert!(MemoryOverlay::new('<', '>', 3).is_err());
        assert!(MemoryOverlay::new('<', '>', 0).is_err());
        assert!(MemoryOverlay::new('<', '>', 16).is_err());
        assert!(MemoryOverlay::new('<', '>', 4).is_ok());
    }

    #[test]
    fn test_span() {
        let overlay = MemoryOverlay::new('<', '>', 2).unwrap();
        assert_eq!(overlay.span(3, 1), 2..4);
        assert_eq!(overlay.span(3, 2), 2..6);
        assert_eq!(overlay.span(4, 2), 4..6);
        assert_eq!(MemoryOverlay::default().span(3, 2), 3..5);
    }

    #[test]
    fn test_word_swap() {
        let overlay = MemoryOverlay::new('<', '>', 2).unwrap();
        let backing = [0x12, 0x34, 0x56, 0x78];
        let mut out = [0u8; 16];

        let lead = overlay.parse(&backing, 0, &mut out, 4);
        assert_eq!(lead, 0);
        assert_eq!(&out[..4], &[0x34, 0x12, 0x78, 0x56]);

        let lead = overlay.parse(&backing, 3, &mut out, 1);
        assert_eq!(lead, 1);
        assert_eq!(out[lead], 0x56);
    }

    #[test]
    fn test_unparse_writes_back() {
        let overlay = MemoryOverlay::new('<', '>', 2).unwrap();
        let mut backing = [0x12, 0x34, 0x56, 0x78];
        let mut scratch = [0u8; 16];

        let lead = overlay.parse(&backing, 3, &mut scratch, 1);
        scratch[lead] = 0xAA;
        overlay.unparse(&mut backing, 3, &scratch, 1);
        assert_eq!(backing, [0x12, 0x34, 0xAA, 0x78]);
    }

    #[test]
    fn test_same_order_round_trips() {
        let overlay = MemoryOverlay::new('>', '>', 4).unwrap();
        assert!(overlay.is_identity());
        let input: Vec<u8> = (0u8..16).collect();
        let mut scratch = [0u8; 16];
        let mut output = vec![0u8; 16];

        let lead = overlay.parse(&input, 5, &mut scratch, 6);
        assert_eq!(&scratch[lead..lead + 6], &input[5..11]);
        overlay.unparse(&mut output, 5, &scratch, 6);
        assert_eq!(&output[4..12], &input[4..12]);
    }
}
