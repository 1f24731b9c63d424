//! Rolling two-frame history of an address space.
//!
//! Each call to [`FrameHistory::record`] shifts the history by one frame:
//! the current snapshot becomes the previous one and the live space is
//! copied into the current slot. Deltas compare the two snapshots, never the
//! live memory, so they stay stable for the whole frame.

use crate::address_space::AddressSpace;
use crate::error::Result;
use crate::variable::Variable;

#[derive(Debug, Default)]
pub struct FrameHistory {
    current: AddressSpace,
    previous: AddressSpace,
    frames: u64,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, live: &AddressSpace) -> Result<()> {
        // The old previous snapshot becomes the copy target, so its owned
        // buffers are reused when the layout is unchanged.
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clone_from_space(live)?;
        self.frames += 1;
        Ok(())
    }

    /// Snapshot taken by the most recent [`record`](Self::record).
    pub fn current(&self) -> &AddressSpace {
        &self.current
    }

    pub fn previous(&self) -> &AddressSpace {
        &self.previous
    }

    /// Number of frames recorded since creation or the last clear.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Change in `var` between the two most recent snapshots. `None` until
    /// two frames are recorded, or when either snapshot cannot hold `var`.
    pub fn delta(&self, var: &Variable) -> Option<i64> {
        if !self.previous.has_block(var.address) {
            return None;
        }
        let now = self.current.read(var).ok()?;
        let before = self.previous.read(var).ok()?;
        Some(now.wrapping_sub(before))
    }

    pub fn clear(&mut self) {
        self.current.reset();
        self.previous.reset();
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;

    #[test]
    fn test_delta_needs_two_frames() {
        let mut live = AddressSpace::new();
        live.add_block(0, 16).unwrap();
        let lives = Variable::new(DataType::new("|u1").unwrap(), 4);
        let mut history = FrameHistory::new();
        assert_eq!(history.delta(&lives), None);

        live.write(&lives, 3).unwrap();
        history.record(&live).unwrap();
        assert_eq!(history.delta(&lives), None);

        live.write(&lives, 1).unwrap();
        history.record(&live).unwrap();
        assert_eq!(history.delta(&lives), Some(-2));
        assert_eq!(history.frames(), 2);

        // Live writes do not disturb the recorded frames.
        live.write(&lives, 9).unwrap();
        assert_eq!(history.delta(&lives), Some(-2));
    }

    #[test]
    fn test_unmapped_variable_has_no_delta() {
        let mut live = AddressSpace::new();
        live.add_block(0, 4).unwrap();
        let mut history = FrameHistory::new();
        history.record(&live).unwrap();
        history.record(&live).unwrap();

        let outside = Variable::new(DataType::new("<u2").unwrap(), 0x100);
        assert_eq!(history.delta(&outside), None);

        history.clear();
        assert_eq!(history.frames(), 0);
        assert!(!history.current().is_ok());
        assert!(!history.previous().is_ok());
    }
}
