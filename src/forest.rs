use std::collections::VecDeque;

use crate::error::{HuffError, Result};
use crate::tree::NodeId;

/// Secondary sort key for trees of equal frequency. Leaves come before internal nodes and are
/// ordered by symbol; internal nodes compare equal to each other, so they keep arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TieBreak {
    Leaf(u8),
    Internal,
}

/// A tree root waiting in the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestEntry {
    pub freq: u64,
    pub tie: TieBreak,
    pub node: NodeId,
}

/// Tree roots kept sorted by `(freq, tie)`, lowest first.
#[derive(Debug, Default)]
pub struct Forest {
    trees: VecDeque<ForestEntry>,
}

impl ForestEntry {
    pub fn key(&self) -> (u64, TieBreak) {
        (self.freq, self.tie)
    }
}

impl Forest {
    pub fn new() -> Self {
        Forest {
            trees: VecDeque::new(),
        }
    }

    /// Plants `entry` right before the first tree whose key is strictly greater, so entries with
    /// equal keys stay in arrival order. Zero-frequency entries are refused and the forest is
    /// left untouched.
    pub fn insert(&mut self, entry: ForestEntry) -> Result<()> {
        if entry.freq == 0 {
            let symbol = match entry.tie {
                TieBreak::Leaf(symbol) => Some(symbol),
                TieBreak::Internal => None,
            };
            return Err(HuffError::ZeroFrequency { symbol });
        }

        let key = entry.key();
        let position = self.trees.partition_point(|tree| tree.key() <= key);
        self.trees.insert(position, entry);

        Ok(())
    }

    pub fn extract_min(&mut self) -> Option<ForestEntry> {
        self.trees.pop_front()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForestEntry> + '_ {
        self.trees.iter()
    }
}
