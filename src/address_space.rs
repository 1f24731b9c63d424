//! Sparse address space built from non-overlapping [`MemoryView`] blocks.

use std::collections::BTreeMap;

use crate::data_type::DataType;
use crate::datum::{Datum, DatumMut};
use crate::error::{Error, Result};
use crate::memory::MemoryView;
use crate::overlay::MemoryOverlay;
use crate::variable::{Variable, DEFAULT_MASK};

/// Blocks keyed by their lowest address, sharing one [`MemoryOverlay`].
#[derive(Debug, Default)]
pub struct AddressSpace {
    blocks: BTreeMap<usize, MemoryView>,
    overlay: MemoryOverlay,
}

impl AddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once at least one block is mapped.
    pub fn is_ok(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Total mapped bytes.
    pub fn len(&self) -> usize {
        self.blocks.values().map(MemoryView::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn blocks(&self) -> &BTreeMap<usize, MemoryView> {
        &self.blocks
    }

    pub fn overlay(&self) -> &MemoryOverlay {
        &self.overlay
    }

    pub fn set_overlay(&mut self, overlay: MemoryOverlay) {
        self.overlay = overlay;
    }

    fn check_free(&self, offset: usize, size: usize) -> Result<()> {
        let end = offset.checked_add(size).ok_or(Error::OutOfBounds {
            address: offset,
            width: size,
        })?;
        let overlaps = self.blocks.contains_key(&offset)
            || self
                .blocks
                .iter()
                .any(|(&start, view)| offset < start + view.len() && start < end);
        if overlaps {
            return Err(Error::Overlap { offset, size });
        }
        Ok(())
    }

    /// Map `size` zeroed bytes at `offset`.
    pub fn add_block(&mut self, offset: usize, size: usize) -> Result<()> {
        self.check_free(offset, size)?;
        self.blocks.insert(offset, MemoryView::open_anonymous(size)?);
        Ok(())
    }

    /// Map an owned copy of `data` at `offset`.
    pub fn add_block_from(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.check_free(offset, data.len())?;
        self.blocks.insert(offset, MemoryView::from_bytes(data)?);
        Ok(())
    }

    /// Map `len` bytes of caller-owned memory at `offset`.
    ///
    /// # Safety
    ///
    /// Same contract as [`MemoryView::open_external`].
    pub unsafe fn add_block_external(&mut self, offset: usize, ptr: *mut u8, len: usize) -> Result<()> {
        self.check_free(offset, len)?;
        self.blocks.insert(offset, MemoryView::open_external(ptr, len));
        Ok(())
    }

    fn block_at(&mut self, offset: usize, len: usize) -> Result<&mut MemoryView> {
        let view = self
            .blocks
            .get_mut(&offset)
            .ok_or(Error::Unmapped { address: offset })?;
        if view.len() != len {
            return Err(Error::OutOfBounds {
                address: offset,
                width: len,
            });
        }
        Ok(view)
    }

    /// Replace the contents of the block starting at `offset` with an owned
    /// copy of `data`, which must be exactly the block's size.
    pub fn update_block(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.block_at(offset, data.len())?.clone_from_slice(data)
    }

    /// Rebind the block starting at `offset` to caller-owned memory of the
    /// same size.
    ///
    /// # Safety
    ///
    /// `ptr` must satisfy [`MemoryView::open_external`] for the block's size.
    pub unsafe fn update_block_external(&mut self, offset: usize, ptr: *mut u8) -> Result<()> {
        let view = self
            .blocks
            .get_mut(&offset)
            .ok_or(Error::Unmapped { address: offset })?;
        let len = view.len();
        *view = MemoryView::open_external(ptr, len);
        Ok(())
    }

    fn locate(&self, address: usize) -> Option<usize> {
        self.blocks
            .range(..=address)
            .next_back()
            .filter(|(start, view)| address - **start < view.len())
            .map(|(&start, _)| start)
    }

    pub fn has_block(&self, address: usize) -> bool {
        self.locate(address).is_some()
    }

    /// The block containing `address`.
    pub fn block(&self, address: usize) -> Result<&MemoryView> {
        self.locate(address)
            .and_then(|start| self.blocks.get(&start))
            .ok_or(Error::Unmapped { address })
    }

    pub fn block_mut(&mut self, address: usize) -> Result<&mut MemoryView> {
        let start = self.locate(address).ok_or(Error::Unmapped { address })?;
        self.blocks.get_mut(&start).ok_or(Error::Unmapped { address })
    }

    /// Block start and block-relative offset for `width` bytes at `address`,
    /// checking that the overlay's word span stays inside the block.
    fn resolve(&self, address: usize, width: usize) -> Result<(usize, usize)> {
        let start = self.locate(address).ok_or(Error::Unmapped { address })?;
        let relative = address - start;
        let len = self.blocks.get(&start).map_or(0, MemoryView::len);
        if self.overlay.span(relative, width).end > len {
            return Err(Error::OutOfBounds { address, width });
        }
        Ok((start, relative))
    }

    fn bind(&self, address: usize, ty: DataType, mask: u64) -> Result<Datum<'_>> {
        let (start, relative) = self.resolve(address, ty.width())?;
        let view = self.blocks.get(&start).ok_or(Error::Unmapped { address })?;
        Ok(Datum::memory(view.as_slice(), relative, ty, &self.overlay, mask))
    }

    fn bind_mut(&mut self, address: usize, ty: DataType, mask: u64) -> Result<DatumMut<'_>> {
        let (start, relative) = self.resolve(address, ty.width())?;
        let overlay = &self.overlay;
        let view = self
            .blocks
            .get_mut(&start)
            .ok_or(Error::Unmapped { address })?;
        Ok(DatumMut::memory(view.as_mut_slice(), relative, ty, overlay, mask))
    }

    /// The single byte at `address`.
    pub fn byte(&self, address: usize) -> Result<Datum<'_>> {
        self.bind(address, DataType::byte(), DEFAULT_MASK)
    }

    pub fn byte_mut(&mut self, address: usize) -> Result<DatumMut<'_>> {
        self.bind_mut(address, DataType::byte(), DEFAULT_MASK)
    }

    pub fn datum(&self, var: &Variable) -> Result<Datum<'_>> {
        self.bind(var.address, var.ty, var.mask)
    }

    pub fn datum_mut(&mut self, var: &Variable) -> Result<DatumMut<'_>> {
        self.bind_mut(var.address, var.ty, var.mask)
    }

    pub fn read(&self, var: &Variable) -> Result<i64> {
        Ok(self.datum(var)?.get())
    }

    pub fn write(&mut self, var: &Variable, value: i64) -> Result<()> {
        self.datum_mut(var)?.set(value);
        Ok(())
    }

    /// Make this space a deep copy of `other`, reusing owned blocks of
    /// matching offset and size.
    pub fn clone_from_space(&mut self, other: &AddressSpace) -> Result<()> {
        self.blocks.retain(|offset, view| {
            other
                .blocks
                .get(offset)
                .is_some_and(|src| src.len() == view.len())
        });
        for (&offset, src) in &other.blocks {
            match self.blocks.get_mut(&offset) {
                Some(view) => view.clone_from_slice(src.as_slice())?,
                None => {
                    self.blocks.insert(offset, src.try_clone()?);
                }
            }
        }
        self.overlay = other.overlay;
        Ok(())
    }

    pub fn try_clone(&self) -> Result<AddressSpace> {
        let mut copy = AddressSpace::new();
        copy.clone_from_space(self)?;
        Ok(copy)
    }

    /// Turn every borrowed block into an owned copy of its current contents.
    pub fn snapshot(&mut self) -> Result<()> {
        for view in self.blocks.values_mut() {
            view.detach()?;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.blocks.clear();
        self.overlay = MemoryOverlay::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn var(code: &str, address: usize) -> Variable {
        Variable::new(DataType::new(code).unwrap(), address)
    }

    fn two_blocks() -> AddressSpace {
        let mut space = AddressSpace::new();
        space.add_block(0, 0x100).unwrap();
        space.add_block(0x100, 0x100).unwrap();
        space
    }

    #[test]
    fn test_block_lookup() {
        let space = two_blocks();
        assert!(space.is_ok());
        assert_eq!(space.len(), 0x200);
        assert!(space.has_block(0));
        assert!(space.has_block(0x1FF));
        assert!(!space.has_block(0x200));
        assert_eq!(space.block(0x150).unwrap().len(), 0x100);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut space = two_blocks();
        assert!(space.byte(0x1FF).is_ok());

        let err = space.byte(0x200).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(space.byte_mut(0x200).is_err());

        // A two-byte value may not straddle the end of a block.
        let err = space.read(&var("<u2", 0x1FF)).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
    }

    #[test]
    fn test_overlapping_blocks_rejected() {
        let mut space = two_blocks();
        assert!(matches!(space.add_block(0x80, 0x10), Err(Error::Overlap { .. })));
        assert!(matches!(space.add_block(0x1F0, 0x20), Err(Error::Overlap { .. })));
        assert!(space.add_block(0x1000, 0x10).is_ok());
        assert!(!space.has_block(0x800));
    }

    #[test]
    fn test_block_past_end_of_address_range() {
        let mut space = AddressSpace::new();
        let err = space.add_block(usize::MAX - 1, 4).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(!space.is_ok());

        space.add_block(usize::MAX - 4, 4).unwrap();
        assert!(space.add_block(0, 1).is_ok());
        assert!(matches!(space.add_block(usize::MAX - 2, 1), Err(Error::Overlap { .. })));
    }

    #[test]
    fn test_read_write_variables() {
        let mut space = two_blocks();
        let score = var(">d2", 0x120);
        space.write(&score, 1234).unwrap();
        assert_eq!(space.read(&score).unwrap(), 1234);
        assert_eq!(space.byte(0x120).unwrap().get(), 0x12);
        assert_eq!(space.byte(0x121).unwrap().get(), 0x34);

        space.byte_mut(0x10).unwrap().set(0xFF);
        assert_eq!(space.read(&var("<i1", 0x10)).unwrap(), -1);
        assert_eq!(space.read(&var("<u1", 0x10).with_mask(0x0F)).unwrap(), 0x0F);
    }

    #[test]
    fn test_overlay_applies_to_all_access() {
        let mut space = AddressSpace::new();
        space.add_block_from(0, &[0x34, 0x12, 0x78, 0x56]).unwrap();
        space.set_overlay(MemoryOverlay::new('<', '>', 2).unwrap());

        assert_eq!(space.byte(0).unwrap().get(), 0x12);
        assert_eq!(space.read(&var(">u4", 0)).unwrap(), 0x12345678);

        space.byte_mut(3).unwrap().set(0xAA);
        assert_eq!(space.block(0).unwrap().as_slice(), &[0x34, 0x12, 0xAA, 0x56]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut space = two_blocks();
        space.byte_mut(5).unwrap().set(7);

        let mut copy = space.try_clone().unwrap();
        copy.byte_mut(5).unwrap().set(9);
        assert_eq!(space.byte(5).unwrap().get(), 7);
        assert_eq!(copy.byte(5).unwrap().get(), 9);

        copy.clone_from_space(&space).unwrap();
        assert_eq!(copy.byte(5).unwrap().get(), 7);
    }

    #[test]
    fn test_clone_drops_stale_blocks() {
        let mut copy = two_blocks();
        copy.add_block(0x4000, 4).unwrap();

        let mut space = AddressSpace::new();
        space.add_block(0, 0x80).unwrap();
        copy.clone_from_space(&space).unwrap();
        assert_eq!(copy.blocks().len(), 1);
        assert_eq!(copy.len(), 0x80);
    }

    #[test]
    fn test_external_blocks_and_snapshot() {
        let mut ram = vec![0u8; 16];
        let len = ram.len();
        let mut space = AddressSpace::new();
        unsafe { space.add_block_external(0x8000, ram.as_mut_ptr(), len).unwrap() };
        space.byte_mut(0x8001).unwrap().set(3);
        assert!(!space.block(0x8000).unwrap().is_managed());

        space.snapshot().unwrap();
        assert!(space.block(0x8000).unwrap().is_managed());
        space.byte_mut(0x8001).unwrap().set(4);
        drop(space);
        assert_eq!(ram[1], 3);
    }

    #[test]
    fn test_update_block() {
        let mut space = two_blocks();
        space.update_block(0x100, &[0xEE; 0x100]).unwrap();
        assert_eq!(space.byte(0x1AB).unwrap().get(), 0xEE);

        assert!(space.update_block(0x100, &[0; 4]).is_err());
        assert!(space.update_block(0x180, &[0; 0x100]).is_err());
    }

    #[test]
    fn test_reset() {
        let mut space = two_blocks();
        space.set_overlay(MemoryOverlay::new('<', '>', 2).unwrap());
        space.reset();
        assert!(!space.is_ok());
        assert_eq!(space.overlay(), &MemoryOverlay::default());
    }
}
