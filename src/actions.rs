//! Reduction of raw button bitmasks to the combinations a game accepts.
//!
//! Each action group lists alternative button combinations. A group's key is
//! the OR of every button it mentions; filtering keeps, per group, the bits
//! of the raw input under that key only when they form one of the listed
//! combinations.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTable {
    groups: BTreeMap<u64, BTreeSet<u64>>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from the console's button names (bit `i` is
    /// `buttons[i]`) and the game's action groups.
    pub fn build<S: AsRef<str>>(buttons: &[S], groups: &[Vec<Vec<S>>]) -> Result<Self> {
        let bit = |name: &str| -> Result<u64> {
            let index = buttons
                .iter()
                .position(|button| !name.is_empty() && button.as_ref() == name)
                .ok_or_else(|| Error::UnknownButton {
                    name: name.to_string(),
                })?;
            u32::try_from(index)
                .ok()
                .and_then(|shift| 1u64.checked_shl(shift))
                .ok_or_else(|| Error::ButtonIndex {
                    name: name.to_string(),
                    index,
                })
        };

        let mut table = ActionTable::new();
        for group in groups {
            let mut key = 0;
            let mut combos = BTreeSet::new();
            for combo in group {
                let mut mask = 0;
                for name in combo {
                    mask |= bit(name.as_ref())?;
                }
                key |= mask;
                combos.insert(mask);
            }
            table.groups.entry(key).or_default().extend(combos);
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group key to the combinations allowed under it.
    pub fn groups(&self) -> &BTreeMap<u64, BTreeSet<u64>> {
        &self.groups
    }

    /// Keep only sanctioned combinations of `action`. An empty table lets
    /// everything through.
    pub fn filter(&self, action: u64) -> u64 {
        if self.groups.is_empty() {
            return action;
        }
        self.groups
            .iter()
            .fold(0, |filtered, (&key, combos)| {
                let masked = action & key;
                if combos.contains(&masked) {
                    filtered | masked
                } else {
                    filtered
                }
            })
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
