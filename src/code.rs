use crate::tree::{HuffmanTree, Node, NodeId};

/// Frequencies are 64-bit, which bounds tree depth well below this (a Fibonacci-shaped tree
/// deep enough to exceed it would need a total count past `u64::MAX`).
pub const MAX_CODE_LENGTH: u8 = 128;

/// A code of `length` bits. The bit taken from the root sits at position `length - 1`.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct PrefixCode {
    pub code: u128,
    pub length: u8,
}

#[derive(Debug, Clone)]
pub struct CodeTable {
    codes: [Option<PrefixCode>; 256],
    // Weight of each symbol's leaf.
    freqs: [u64; 256],
    len: usize,
}

impl PrefixCode {
    pub fn update(prefix_code: PrefixCode, bit: u8) -> PrefixCode {
        debug_assert!(prefix_code.length < MAX_CODE_LENGTH);

        PrefixCode {
            code: (prefix_code.code << 1) | u128::from(bit & 1),
            length: prefix_code.length + 1,
        }
    }

    /// Bits in transmission order, root first.
    pub fn bits(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.length)
            .rev()
            .map(move |i| ((self.code >> i) & 1) as u8)
    }
}

impl std::fmt::Display for PrefixCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in self.bits() {
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PrefixCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrefixCode {{ code: {}, length: {} }}", self, self.length)
    }
}

impl CodeTable {
    pub fn empty() -> Self {
        CodeTable {
            codes: [None; 256],
            freqs: [0; 256],
            len: 0,
        }
    }

    pub fn code(&self, symbol: u8) -> Option<&PrefixCode> {
        self.codes[symbol as usize].as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Codes in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &PrefixCode)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(symbol, code)| code.as_ref().map(|code| (symbol as u8, code)))
    }

    /// Frequency the symbol's leaf was built with, 0 for symbols without a code.
    pub fn freq(&self, symbol: u8) -> u64 {
        self.freqs[symbol as usize]
    }

    /// Number of bits the input this table was built from encodes to, trailer excluded.
    pub fn encoded_bits(&self) -> u128 {
        self.iter()
            .map(|(symbol, code)| u128::from(self.freq(symbol)) * u128::from(code.length))
            .sum()
    }

    fn insert(&mut self, symbol: u8, freq: u64, code: PrefixCode) {
        self.freqs[symbol as usize] = freq;
        if self.codes[symbol as usize].replace(code).is_none() {
            self.len += 1;
        }
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&HuffmanTree> for CodeTable {
    fn from(tree: &HuffmanTree) -> Self {
        let mut table = CodeTable::empty();

        // A lone leaf hangs off an implicit left edge so that every occurrence costs one bit.
        if let Node::Leaf { symbol, freq } = tree.node(tree.root()) {
            table.insert(*symbol, *freq, PrefixCode::update(PrefixCode::default(), 1));
            return table;
        }

        let mut stack: Vec<(NodeId, PrefixCode)> = vec![(tree.root(), PrefixCode::default())];

        while let Some((idx, code)) = stack.pop() {
            match tree.node(idx) {
                Node::Leaf { symbol, freq } => {
                    log::trace!("code for {:#04x}: {}", symbol, code);
                    table.insert(*symbol, *freq, code);
                }
                Node::Internal { left, right, .. } => {
                    // Right is pushed first so the left subtree is visited first.
                    stack.push((*right, PrefixCode::update(code, 0)));
                    stack.push((*left, PrefixCode::update(code, 1)));
                }
            }
        }

        table
    }
}

/// One line per symbol, heaviest first: `frequency symbol (char) -> code`.
impl std::fmt::Display for CodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<(u8, &PrefixCode)> = self.iter().collect();
        entries.sort_by_key(|&(symbol, _)| std::cmp::Reverse(self.freq(symbol)));

        for (symbol, code) in entries {
            let printable = if symbol.is_ascii_graphic() {
                symbol as char
            } else {
                '.'
            };
            writeln!(
                f,
                "{:05} {:#04x} ({}) -> {}",
                self.freq(symbol),
                symbol,
                printable,
                code
            )?;
        }
        Ok(())
    }
}
