//! Bound accessors for a single value.
//!
//! A datum borrows either a slice of an address-space block or a [`Variant`]
//! owned by a [`GameData`](crate::game_data::GameData). The borrow keeps the
//! owner from being restructured (blocks added, spaces cloned or reset) while
//! the datum is alive.

use crate::data_type::{DataType, MAX_WIDTH};
use crate::overlay::MemoryOverlay;
use crate::variable::Variant;

/// Large enough for the widest value plus its word-aligned padding.
const SCRATCH: usize = 2 * MAX_WIDTH;

#[derive(Debug, Clone, Copy)]
struct Location<'a> {
    offset: usize,
    ty: DataType,
    overlay: &'a MemoryOverlay,
    mask: u64,
}

#[derive(Debug, Clone, Copy)]
enum Binding<'a> {
    Unbound,
    Memory(&'a [u8], Location<'a>),
    Variant(&'a Variant),
}

#[derive(Debug)]
enum BindingMut<'a> {
    Unbound,
    Memory(&'a mut [u8], Location<'a>),
    Variant(&'a mut Variant),
}

/// Read-only view of one value.
#[derive(Debug, Clone, Copy)]
pub struct Datum<'a> {
    binding: Binding<'a>,
}

/// Read-write view of one value.
#[derive(Debug)]
pub struct DatumMut<'a> {
    binding: BindingMut<'a>,
}

impl<'a> Datum<'a> {
    /// A datum bound to nothing; it always reads 0.
    pub fn unbound() -> Self {
        Datum {
            binding: Binding::Unbound,
        }
    }

    pub fn variant(variant: &'a Variant) -> Self {
        Datum {
            binding: Binding::Variant(variant),
        }
    }

    /// `bytes` must cover `overlay.span(offset, ty.width())`.
    pub(crate) fn memory(
        bytes: &'a [u8],
        offset: usize,
        ty: DataType,
        overlay: &'a MemoryOverlay,
        mask: u64,
    ) -> Self {
        Datum {
            binding: Binding::Memory(
                bytes,
                Location {
                    offset,
                    ty,
                    overlay,
                    mask,
                },
            ),
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.binding, Binding::Unbound)
    }

    pub fn get(&self) -> i64 {
        match self.binding {
            Binding::Unbound => 0,
            Binding::Memory(bytes, location) => read_masked(bytes, &location),
            Binding::Variant(variant) => variant.to_i64(),
        }
    }
}

impl Default for Datum<'_> {
    fn default() -> Self {
        Datum::unbound()
    }
}

impl<'a> DatumMut<'a> {
    pub fn unbound() -> Self {
        DatumMut {
            binding: BindingMut::Unbound,
        }
    }

    pub fn variant(variant: &'a mut Variant) -> Self {
        DatumMut {
            binding: BindingMut::Variant(variant),
        }
    }

    /// `bytes` must cover `overlay.span(offset, ty.width())`.
    pub(crate) fn memory(
        bytes: &'a mut [u8],
        offset: usize,
        ty: DataType,
        overlay: &'a MemoryOverlay,
        mask: u64,
    ) -> Self {
        DatumMut {
            binding: BindingMut::Memory(
                bytes,
                Location {
                    offset,
                    ty,
                    overlay,
                    mask,
                },
            ),
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.binding, BindingMut::Unbound)
    }

    pub fn get(&self) -> i64 {
        match &self.binding {
            BindingMut::Unbound => 0,
            BindingMut::Memory(bytes, location) => read_masked(bytes, location),
            BindingMut::Variant(variant) => variant.to_i64(),
        }
    }

    /// Store `value`. Memory-bound data only replace the bits under their
    /// mask; writes to an unbound datum are dropped.
    pub fn set(&mut self, value: i64) {
        match &mut self.binding {
            BindingMut::Unbound => {}
            BindingMut::Memory(bytes, location) => {
                let value = if location.mask == u64::MAX {
                    value
                } else {
                    let old = read_raw(bytes, location) as u64;
                    ((old & !location.mask) | (value as u64 & location.mask)) as i64
                };
                write_raw(bytes, location, value);
            }
            BindingMut::Variant(variant) => **variant = Variant::Int(value),
        }
    }
}

fn read_masked(bytes: &[u8], location: &Location<'_>) -> i64 {
    (read_raw(bytes, location) as u64 & location.mask) as i64
}

fn read_raw(bytes: &[u8], location: &Location<'_>) -> i64 {
    let Location {
        offset, ty, overlay, ..
    } = location;
    if overlay.is_identity() {
        return ty.decode(&bytes[*offset..]);
    }
    let mut scratch = [0u8; SCRATCH];
    let lead = overlay.parse(bytes, *offset, &mut scratch, ty.width());
    ty.decode(&scratch[lead..])
}

fn write_raw(bytes: &mut [u8], location: &Location<'_>, value: i64) {
    let Location {
        offset, ty, overlay, ..
    } = location;
    if overlay.is_identity() {
        ty.encode(&mut bytes[*offset..], value);
        return;
    }
    let mut scratch = [0u8; SCRATCH];
    let lead = overlay.parse(bytes, *offset, &mut scratch, ty.width());
    ty.encode(&mut scratch[lead..], value);
    overlay.unparse(bytes, *offset, &scratch, ty.width());
}
