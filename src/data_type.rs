//! Type codes and the integer codecs behind them.
//!
//! A type code is two to four ASCII characters laid out as
//! `[endian][endian2?][repr][width]`:
//!
//! - endian: `=` native, `>` big, `<` little, anything else (usually `|`)
//!   undefined. A second tag selects a mixed order: `><` and `<>` swap
//!   bytes within each half, `>=` and `<=` keep host order within each half.
//! - repr: `i` signed, `u` unsigned, `d` packed BCD, `n` one BCD digit per
//!   byte in the low nibble.
//! - width: `1` to `8` bytes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Widest value a [`DataType`] can describe, in bytes.
pub const MAX_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
    Native,
    /// Big-endian halves, little-endian bytes within each half.
    MixedBL,
    /// Little-endian halves, big-endian bytes within each half.
    MixedLB,
    /// Big-endian halves, host order within each half.
    MixedBN,
    /// Little-endian halves, host order within each half.
    MixedLN,
    Undef,
}

impl Endian {
    pub fn from_tags(first: Option<u8>, second: Option<u8>) -> Endian {
        match (first, second) {
            (Some(b'>'), Some(b'<')) => Endian::MixedBL,
            (Some(b'>'), Some(b'=')) => Endian::MixedBN,
            (Some(b'<'), Some(b'>')) => Endian::MixedLB,
            (Some(b'<'), Some(b'=')) => Endian::MixedLN,
            (Some(b'>'), _) => Endian::Big,
            (Some(b'<'), _) => Endian::Little,
            (Some(b'='), _) => Endian::Native,
            _ => Endian::Undef,
        }
    }

    /// Collapse host-dependent orders into one of `Big`, `Little`, `MixedBL`
    /// or `MixedLB`.
    pub fn resolve(self) -> Endian {
        let little = cfg!(target_endian = "little");
        match self {
            Endian::Native | Endian::Undef => {
                if little {
                    Endian::Little
                } else {
                    Endian::Big
                }
            }
            Endian::MixedBN => {
                if little {
                    Endian::MixedBL
                } else {
                    Endian::Big
                }
            }
            Endian::MixedLN => {
                if little {
                    Endian::Little
                } else {
                    Endian::MixedLB
                }
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repr {
    Signed,
    Unsigned,
    Bcd,
    LnBcd,
}

impl Repr {
    /// Unknown tags read as unsigned.
    pub fn from_tag(tag: u8) -> Repr {
        match tag {
            b'i' => Repr::Signed,
            b'd' => Repr::Bcd,
            b'n' => Repr::LnBcd,
            _ => Repr::Unsigned,
        }
    }

    /// Positional weight of one stored byte.
    pub fn radix(self) -> u64 {
        match self {
            Repr::Bcd => 100,
            Repr::LnBcd => 10,
            Repr::Signed | Repr::Unsigned => 256,
        }
    }
}

/// A parsed type code. Equality and hashing consider width, endianness and
/// representation only, not the spelling of the code.
#[derive(Debug, Clone, Copy)]
pub struct DataType {
    width: usize,
    endian: Endian,
    repr: Repr,
    code: [u8; 4],
    shift: [u64; MAX_WIDTH],
}

impl DataType {
    pub fn new(code: &str) -> Result<Self> {
        let bytes = code.as_bytes();
        let invalid = |reason| Error::InvalidType {
            code: code.to_string(),
            reason,
        };
        if !(2..=4).contains(&bytes.len()) {
            return Err(invalid("type codes are 2 to 4 characters long"));
        }

        let (prefix, tail) = bytes.split_at(bytes.len() - 2);
        let width = match tail[1] {
            digit @ b'0'..=b'9' => usize::from(digit - b'0'),
            _ => return Err(invalid("width is not a digit")),
        };
        if width == 0 || width > MAX_WIDTH {
            return Err(invalid("width out of range"));
        }

        let repr = Repr::from_tag(tail[0]);
        let endian = Endian::from_tags(prefix.first().copied(), prefix.get(1).copied());
        let mut packed = [0u8; 4];
        packed[..bytes.len()].copy_from_slice(bytes);
        Ok(Self::from_parts(width, endian, repr, packed))
    }

    /// Single unsigned byte, as used for raw address-space access.
    pub fn byte() -> Self {
        Self::from_parts(1, Endian::Undef, Repr::Unsigned, *b"|u1\0")
    }

    fn from_parts(width: usize, endian: Endian, repr: Repr, code: [u8; 4]) -> Self {
        DataType {
            width,
            endian,
            repr,
            code,
            shift: build_shift_table(width, endian.resolve(), repr.radix()),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn resolved_endian(&self) -> Endian {
        self.endian.resolve()
    }

    pub fn repr(&self) -> Repr {
        self.repr
    }

    /// Positional multiplier of each stored byte; entries past `width` are 0.
    pub fn shift_table(&self) -> &[u64; MAX_WIDTH] {
        &self.shift
    }

    /// Store `value` in the first `width` bytes of `buffer`.
    ///
    /// Panics if `buffer` is shorter than `width`.
    pub fn encode(&self, buffer: &mut [u8], value: i64) {
        let value = value as u64;
        let radix = self.repr.radix();
        for (byte, &place) in buffer[..self.width].iter_mut().zip(&self.shift) {
            let digit = (value / place) % radix;
            *byte = match self.repr {
                Repr::Bcd => (((digit / 10) << 4) | (digit % 10)) as u8,
                _ => digit as u8,
            };
        }
    }

    /// Read a value from the first `width` bytes of `buffer`.
    ///
    /// Panics if `buffer` is shorter than `width`.
    pub fn decode(&self, buffer: &[u8]) -> i64 {
        let mut value = 0u64;
        for (&byte, &place) in buffer[..self.width].iter().zip(&self.shift) {
            let digit = match self.repr {
                Repr::Bcd => u64::from(byte >> 4) * 10 + u64::from(byte & 0xF),
                Repr::LnBcd => u64::from(byte & 0xF),
                Repr::Signed | Repr::Unsigned => u64::from(byte),
            };
            value = value.wrapping_add(digit.wrapping_mul(place));
        }

        let value = value as i64;
        if self.repr == Repr::Signed {
            let bits = (8 * (MAX_WIDTH - self.width)) as u32;
            (value << bits) >> bits
        } else {
            value
        }
    }
}

fn build_shift_table(width: usize, endian: Endian, radix: u64) -> [u64; MAX_WIDTH] {
    let mut powers = [0u64; MAX_WIDTH];
    let mut place = 1u64;
    for power in powers.iter_mut().take(width) {
        *power = place;
        place = place.wrapping_mul(radix);
    }

    // Mixed orders need two equal halves; odd widths use the outer order.
    let half = width / 2;
    let split = width >= 2 && width % 2 == 0;
    let mut table = [0u64; MAX_WIDTH];
    for (i, slot) in table.iter_mut().enumerate().take(width) {
        let significance = match endian {
            Endian::Big => width - 1 - i,
            Endian::MixedBL if split => (1 - i / half) * half + i % half,
            Endian::MixedBL => width - 1 - i,
            Endian::MixedLB if split => (i / half) * half + (half - 1 - i % half),
            _ => i,
        };
        *slot = powers[significance];
    }
    table
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.endian == other.endian && self.repr == other.repr
    }
}

impl Eq for DataType {}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.hash(state);
        self.endian.hash(state);
        self.repr.hash(state);
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        DataType::new(code)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.code.iter().position(|&b| b == 0).unwrap_or(self.code.len());
        f.write_str(std::str::from_utf8(&self.code[..len]).unwrap_or("?"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn encoded(code: &str, value: i64) -> Vec<u8> {
        let ty = DataType::new(code).unwrap();
        let mut buffer = vec![0u8; ty.width()];
        ty.encode(&mut buffer, value);
        buffer
    }

    #[test]
    fn test_little_and_big_endian() {
        assert_eq!(encoded("<u2", 0x1234), vec![0x34, 0x12]);
        assert_eq!(encoded(">u2", 0x1234), vec![0x12, 0x34]);
        assert_eq!(encoded(">u4", 0x11223344), vec![0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_mixed_endian() {
        assert_eq!(encoded("><u4", 0x11223344), vec![0x22, 0x11, 0x44, 0x33]);
        assert_eq!(encoded("<>u4", 0x11223344), vec![0x33, 0x44, 0x11, 0x22]);

        let ty = DataType::new("><u4").unwrap();
        assert_eq!(ty.decode(&[0x22, 0x11, 0x44, 0x33]), 0x11223344);
    }

    #[test]
    fn test_mixed_native_resolution() {
        let bn = DataType::new(">=u4").unwrap();
        let ln = DataType::new("<=u4").unwrap();
        if cfg!(target_endian = "little") {
            assert_eq!(bn.resolved_endian(), Endian::MixedBL);
            assert_eq!(ln.resolved_endian(), Endian::Little);
        } else {
            assert_eq!(bn.resolved_endian(), Endian::Big);
            assert_eq!(ln.resolved_endian(), Endian::MixedLB);
        }
    }

    #[test]
    fn test_odd_width_mixed_falls_back() {
        assert_eq!(encoded("><u3", 0x112233), vec![0x11, 0x22, 0x33]);
        assert_eq!(encoded("<>u3", 0x112233), vec![0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_bcd() {
        assert_eq!(encoded(">d2", 1234), vec![0x12, 0x34]);
        assert_eq!(encoded("<d3", 123456), vec![0x56, 0x34, 0x12]);
        assert_eq!(encoded(">n3", 907), vec![9, 0, 7]);

        // High nibbles are ignored for low-nibble BCD.
        let ty = DataType::new("<n2").unwrap();
        assert_eq!(ty.decode(&[0xF3, 0xA1]), 13);
    }

    #[test]
    fn test_signed_sign_extension() {
        let ty = DataType::new("<i2").unwrap();
        assert_eq!(ty.decode(&[0xFF, 0xFF]), -1);
        assert_eq!(ty.decode(&[0x00, 0x80]), -32768);
        assert_eq!(ty.decode(&[0xFF, 0x7F]), 32767);

        let unsigned = DataType::new("<u2").unwrap();
        assert_eq!(unsigned.decode(&[0xFF, 0xFF]), 0xFFFF);

        let wide = DataType::new(">i8").unwrap();
        let mut buffer = [0u8; 8];
        wide.encode(&mut buffer, i64::MIN);
        assert_eq!(wide.decode(&buffer), i64::MIN);
    }

    #[test]
    fn test_invalid_widths() {
        for code in ["<u9", "<u0", "<ux", "u", "><<u2"] {
            let err = DataType::new(code).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Construction, "{code}");
        }
    }

    #[test]
    fn test_equality_ignores_spelling() {
        let a = DataType::new(">u2").unwrap();
        let b = DataType::new(">xu2").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.to_string(), b.to_string());
        assert_ne!(a, DataType::new("<u2").unwrap());
        assert_ne!(a, DataType::new(">i2").unwrap());
        assert_eq!(a.to_string(), ">u2");
    }

    #[test]
    fn test_shift_table() {
        let ty = DataType::new(">u3").unwrap();
        assert_eq!(&ty.shift_table()[..4], &[0x10000, 0x100, 1, 0]);
        let bcd = DataType::new("<d2").unwrap();
        assert_eq!(&bcd.shift_table()[..2], &[1, 100]);
        let nibble = DataType::new("<n3").unwrap();
        assert_eq!(&nibble.shift_table()[..3], &[1, 10, 100]);
    }

    #[test]
    fn test_random_round_trips() {
        let mut rng = rand::thread_rng();
        let endians = [">", "<", "=", "|", "><", "<>", ">=", "<="];
        for endian in endians {
            for repr in ['i', 'u', 'd', 'n'] {
                for width in 1..=MAX_WIDTH as u32 {
                    let ty = DataType::new(&format!("{endian}{repr}{width}")).unwrap();
                    for _ in 0..64 {
                        let value: i64 = match repr {
                            'i' if width == 8 => rng.gen(),
                            'i' => {
                                let bound = 1i64 << (8 * width - 1);
                                rng.gen_range(-bound..bound)
                            }
                            'u' if width == 8 => rng.gen(),
                            'u' => rng.gen_range(0..1i64 << (8 * width)),
                            'd' => rng.gen_range(0..100i64.pow(width)),
                            _ => rng.gen_range(0..10i64.pow(width)),
                        };
                        let mut buffer = [0u8; MAX_WIDTH];
                        ty.encode(&mut buffer, value);
                        assert_eq!(ty.decode(&buffer), value, "{ty} {value}");
                    }
                }
            }
        }
    }
}
