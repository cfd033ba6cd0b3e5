use crate::error::{HuffError, Result};
use crate::forest::{Forest, ForestEntry, TieBreak};
use crate::frequency::FrequencyTable;

/// Index of a node inside a [`HuffmanTree`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Leaf {
        symbol: u8,
        freq: u64,
    },
    Internal {
        freq: u64,
        left: NodeId,
        right: NodeId,
    },
}

/// A Huffman tree stored as an arena. Leaves come first, internal nodes follow in merge order,
/// so every child has a smaller index than its parent and the root is the last node.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: NodeId,
}

/// Position of a bit-by-bit descent through the tree. `symbol` is set once the walk lands on a
/// leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkIterator {
    pub idx: NodeId,
    pub depth: u32,
    pub symbol: Option<u8>,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Node {
    pub fn freq(&self) -> u64 {
        match self {
            Node::Leaf { freq, .. } | Node::Internal { freq, .. } => *freq,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    fn tie_break(&self) -> TieBreak {
        match self {
            Node::Leaf { symbol, .. } => TieBreak::Leaf(*symbol),
            Node::Internal { .. } => TieBreak::Internal,
        }
    }
}

impl HuffmanTree {
    /// Builds the tree for every nonzero entry of `freqs`. Returns `Ok(None)` when there is
    /// nothing to code.
    pub fn build(freqs: &FrequencyTable) -> Result<Option<HuffmanTree>> {
        let num_symbols = freqs.distinct();
        let mut nodes = Vec::<Node>::with_capacity((2 * num_symbols).saturating_sub(1));
        let mut forest = Forest::new();

        for (symbol, freq) in freqs.iter() {
            plant(&mut nodes, &mut forest, Node::Leaf { symbol, freq })?;
        }

        // Until a single tree remains, pop the two lightest ones and join them under a new node.
        let root = loop {
            let Some(first) = forest.extract_min() else {
                return Ok(None);
            };
            let Some(second) = forest.extract_min() else {
                break first.node;
            };

            let freq = first
                .freq
                .checked_add(second.freq)
                .ok_or(HuffError::FrequencyOverflow)?;

            log::trace!(
                "merging {:?} ({}) with {:?} ({})",
                first.tie,
                first.freq,
                second.tie,
                second.freq
            );

            plant(
                &mut nodes,
                &mut forest,
                Node::Internal {
                    freq,
                    left: first.node,
                    right: second.node,
                },
            )?;
        };

        let tree = HuffmanTree { nodes, root };
        log::debug!(
            "built huffman tree: {} symbols, {} nodes, total weight {}",
            num_symbols,
            tree.nodes.len(),
            tree.freq()
        );

        Ok(Some(tree))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, idx: NodeId) -> &Node {
        &self.nodes[idx.0]
    }

    /// Total weight, equal to the sum of all leaf frequencies.
    pub fn freq(&self) -> u64 {
        self.node(self.root).freq()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    pub fn create_walk_iter(&self) -> WalkIterator {
        WalkIterator {
            idx: self.root,
            depth: 0,
            symbol: None,
        }
    }

    /// Follows one edge: `1` goes left, `0` goes right. A tree made of a single leaf has one
    /// implicit left edge looping back onto itself. Returns `None` when there is no such edge.
    pub fn walk(&self, iter: WalkIterator, bit: u8) -> Option<WalkIterator> {
        let idx = match *self.node(iter.idx) {
            Node::Internal { left, right, .. } => {
                if bit == 1 {
                    left
                } else {
                    right
                }
            }
            Node::Leaf { .. } if iter.idx == self.root && bit == 1 => self.root,
            Node::Leaf { .. } => return None,
        };

        let symbol = match *self.node(idx) {
            Node::Leaf { symbol, .. } => Some(symbol),
            Node::Internal { .. } => None,
        };

        Some(WalkIterator {
            idx,
            depth: iter.depth + 1,
            symbol,
        })
    }
}

fn plant(nodes: &mut Vec<Node>, forest: &mut Forest, node: Node) -> Result<()> {
    let entry = ForestEntry {
        freq: node.freq(),
        tie: node.tie_break(),
        node: NodeId(nodes.len()),
    };

    forest.insert(entry)?;
    nodes.push(node);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(u8, u64)]) -> Option<HuffmanTree> {
        let freqs: FrequencyTable = pairs.iter().copied().collect();
        HuffmanTree::build(&freqs).unwrap()
    }

    fn leaf_symbol(tree: &HuffmanTree, idx: NodeId) -> Option<u8> {
        match tree.node(idx) {
            Node::Leaf { symbol, .. } => Some(*symbol),
            Node::Internal { .. } => None,
        }
    }

    #[test]
    fn test_empty_table_has_no_tree() {
        assert!(build(&[]).is_none());
    }

    #[test]
    fn test_single_symbol_tree_is_a_leaf() {
        let tree = build(&[(b'q', 9)]).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.freq(), 9);
        assert_eq!(leaf_symbol(&tree, tree.root()), Some(b'q'));

        let step = tree.walk(tree.create_walk_iter(), 1).unwrap();
        assert_eq!(step.symbol, Some(b'q'));
        assert!(tree.walk(tree.create_walk_iter(), 0).is_none());
    }

    #[test]
    fn test_first_merge_takes_lowest_symbols() {
        let tree = build(&[(b'a', 5), (b'b', 2), (b'c', 1), (b'd', 1)]).unwrap();
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.num_leaves(), 4);
        assert_eq!(tree.freq(), 9);

        // Leaves occupy 0..4, so the first merge is node 4.
        match *tree.node(NodeId(4)) {
            Node::Internal { freq, left, right } => {
                assert_eq!(freq, 2);
                assert_eq!(leaf_symbol(&tree, left), Some(b'c'));
                assert_eq!(leaf_symbol(&tree, right), Some(b'd'));
            }
            Node::Leaf { .. } => panic!("expected the c+d merge"),
        }

        match *tree.node(tree.root()) {
            Node::Internal { right, .. } => assert_eq!(leaf_symbol(&tree, right), Some(b'a')),
            Node::Leaf { .. } => panic!("root must be internal"),
        }
    }

    #[test]
    fn test_total_weight_is_preserved() {
        let pairs: Vec<(u8, u64)> = (0..=255u8)
            .map(|s| (s, u64::from(s).pow(2) % 1000 + 1))
            .collect();
        let total: u64 = pairs.iter().map(|(_, f)| f).sum();

        let tree = build(&pairs).unwrap();
        assert_eq!(tree.freq(), total);
        assert_eq!(tree.len(), 2 * 256 - 1);

        for idx in 0..tree.len() {
            if let Node::Internal { freq, left, right } = *tree.node(NodeId(idx)) {
                assert_eq!(freq, tree.node(left).freq() + tree.node(right).freq());
                assert!(left.index() < idx && right.index() < idx);
            }
        }
    }

    #[test]
    fn test_walk_reaches_leaf() {
        let tree = build(&[(b'a', 5), (b'b', 2), (b'c', 1), (b'd', 1)]).unwrap();

        let mut iter = tree.create_walk_iter();
        for bit in [1, 0] {
            iter = tree.walk(iter, bit).unwrap();
            assert_eq!(iter.symbol, None);
        }
        iter = tree.walk(iter, 1).unwrap();
        assert_eq!(iter.symbol, Some(b'c'));
        assert_eq!(iter.depth, 3);
        assert!(tree.walk(iter, 1).is_none());
    }

    #[test]
    fn test_overflowing_weights_rejected() {
        let freqs: FrequencyTable = [(1, u64::MAX), (2, 1)].into_iter().collect();
        let err = HuffmanTree::build(&freqs).unwrap_err();
        assert!(matches!(err, HuffError::FrequencyOverflow));
    }
}
