use std::io::{ErrorKind, Read};

use crate::error::Result;

const SYMBOLS: usize = 256;

/// Occurrence count for every byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; SYMBOLS],
}

impl FrequencyTable {
    pub fn new() -> Self {
        FrequencyTable {
            counts: [0; SYMBOLS],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut table = Self::new();
        table.update(bytes);
        table
    }

    /// Counts every byte `reader` yields until it is exhausted.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut table = Self::new();
        let mut buffer = [0u8; 8192];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(num_read_bytes) => table.update(&buffer[..num_read_bytes]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(table)
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.counts[byte as usize] += 1;
        }
    }

    pub fn set(&mut self, symbol: u8, count: u64) {
        self.counts[symbol as usize] = count;
    }

    pub fn get(&self, symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }

    /// Nonzero entries in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count != 0)
            .map(|(symbol, &count)| (symbol as u8, count))
    }

    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&count| count != 0).count()
    }

    /// Sum of all counts, `None` if it doesn't fit in 64 bits.
    pub fn total(&self) -> Option<u64> {
        self.counts
            .iter()
            .try_fold(0u64, |acc, &count| acc.checked_add(count))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&count| count == 0)
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(u8, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (u8, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (symbol, count) in iter {
            table.set(symbol, count);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_counts_bytes() {
        let table = FrequencyTable::from_bytes(b"abracadabra");
        assert_eq!(table.get(b'a'), 5);
        assert_eq!(table.get(b'b'), 2);
        assert_eq!(table.get(b'r'), 2);
        assert_eq!(table.get(b'c'), 1);
        assert_eq!(table.get(b'd'), 1);
        assert_eq!(table.get(b'z'), 0);
        assert_eq!(table.distinct(), 5);
        assert_eq!(table.total(), Some(11));
    }

    #[test]
    fn test_iter_skips_zero_counts() {
        let table: FrequencyTable = [(3, 0), (200, 4), (7, 1)].into_iter().collect();
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![(7, 1), (200, 4)]);
    }

    #[test]
    fn test_from_reader_matches_from_bytes() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let from_reader = FrequencyTable::from_reader(Cursor::new(&data)).unwrap();
        assert_eq!(from_reader, FrequencyTable::from_bytes(&data));
    }

    #[test]
    fn test_empty_and_overflowing_totals() {
        let table = FrequencyTable::new();
        assert!(table.is_empty());
        assert_eq!(table.total(), Some(0));

        let table: FrequencyTable = [(0, u64::MAX), (1, 1)].into_iter().collect();
        assert_eq!(table.total(), None);
    }
}
