use std::io::{BufReader, BufWriter, Cursor, ErrorKind, Read, Seek, Write};

use crate::bitio::{BitReader, BitSink, BitSource, BitWriter};
use crate::code::CodeTable;
use crate::error::{HuffError, Result};
use crate::frequency::FrequencyTable;
use crate::tree::HuffmanTree;

#[derive(Debug, Clone, Copy)]
pub struct CodecOptions {
    /// Capacity of the buffers wrapped around the raw reader and writer.
    pub buffer_capacity: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 8 * 1024,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    pub symbols: u64,
    pub bits: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    pub symbols: u64,
    pub bits: u64,
}

/// Encoder and decoder for one frequency table. Both directions share the tree and the code
/// table, so any two codecs built from the same table agree on every code.
#[derive(Debug, Clone)]
pub struct Codec {
    tree: Option<HuffmanTree>,
    table: CodeTable,
    options: CodecOptions,
}

impl EncodeSummary {
    /// Size of the compressed stream in bytes, trailer included.
    pub fn compressed_len(&self) -> u64 {
        self.bits.div_ceil(8) + 1
    }
}

impl Codec {
    pub fn from_frequencies(freqs: &FrequencyTable) -> Result<Self> {
        let tree = HuffmanTree::build(freqs)?;
        let table = tree.as_ref().map(CodeTable::from).unwrap_or_default();

        Ok(Codec {
            tree,
            table,
            options: CodecOptions::default(),
        })
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tree(&self) -> Option<&HuffmanTree> {
        self.tree.as_ref()
    }

    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    /// Writes the code of every byte of `reader`, in order, to `sink`. The sink is not finished.
    pub fn encode_bits(
        &self,
        reader: impl Read,
        sink: &mut impl BitSink,
    ) -> Result<EncodeSummary> {
        let mut reader = BufReader::with_capacity(self.options.buffer_capacity, reader);
        let mut summary = EncodeSummary::default();
        let mut buffer = [0u8; 512];

        loop {
            let num_read_bytes = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            for &symbol in &buffer[..num_read_bytes] {
                let code = self
                    .table
                    .code(symbol)
                    .ok_or(HuffError::UnknownSymbol(symbol))?;

                sink.write_code(code)?;
                summary.symbols += 1;
                summary.bits += u64::from(code.length);
            }
        }

        log::debug!(
            "encoded {} symbols into {} bits",
            summary.symbols,
            summary.bits
        );

        Ok(summary)
    }

    /// Encodes `reader` into `writer` and terminates the stream with its trailer byte.
    pub fn encode(&self, reader: impl Read, writer: impl Write) -> Result<EncodeSummary> {
        let mut bit_writer = BitWriter::new(BufWriter::with_capacity(
            self.options.buffer_capacity,
            writer,
        ));

        let summary = self.encode_bits(reader, &mut bit_writer)?;
        bit_writer.finish()?;

        Ok(summary)
    }

    pub fn encode_to_vec(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut bit_writer = BitWriter::new(Vec::new());
        self.encode_bits(data, &mut bit_writer)?;
        bit_writer.finish()
    }

    /// Walks the tree bit by bit, emitting a symbol at every leaf, until `source` runs dry. Running
    /// dry anywhere but at the root means the last code was cut short.
    pub fn decode_bits(
        &self,
        source: &mut impl BitSource,
        writer: impl Write,
    ) -> Result<DecodeSummary> {
        let mut writer = BufWriter::with_capacity(self.options.buffer_capacity, writer);
        let mut summary = DecodeSummary::default();

        let Some(tree) = &self.tree else {
            // Nothing can be coded without symbols, so any bit at all is garbage.
            if source.read_bit()?.is_some() {
                return Err(corrupt(&*source));
            }
            return Ok(summary);
        };

        let mut iter = tree.create_walk_iter();

        while let Some(bit) = source.read_bit()? {
            iter = match tree.walk(iter, bit) {
                Some(iter) => iter,
                None => return Err(corrupt(&*source)),
            };

            if let Some(symbol) = iter.symbol {
                writer.write_all(&[symbol])?;
                summary.symbols += 1;
                iter = tree.create_walk_iter();
            }
        }

        if iter.depth != 0 {
            return Err(corrupt(&*source));
        }

        writer.flush()?;
        summary.bits = source.bits_read();

        log::debug!(
            "decoded {} symbols from {} bits",
            summary.symbols,
            summary.bits
        );

        Ok(summary)
    }

    pub fn decode(&self, reader: impl Read + Seek, writer: impl Write) -> Result<DecodeSummary> {
        let mut bit_reader =
            BitReader::new(BufReader::with_capacity(self.options.buffer_capacity, reader))?;
        log::debug!("stream carries {} bits", bit_reader.total_bits());
        self.decode_bits(&mut bit_reader, writer)
    }

    pub fn decode_from_slice(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.decode(Cursor::new(data), &mut output)?;
        Ok(output)
    }
}

fn corrupt(source: &impl BitSource) -> HuffError {
    let bits_read = source.bits_read();
    log::warn!("corrupt stream: no code ends at bit {}", bits_read);
    HuffError::CorruptStream { bits_read }
}
