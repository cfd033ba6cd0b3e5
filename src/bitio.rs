use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::str::FromStr;

use crate::code::PrefixCode;
use crate::error::{HuffError, Result};

/// Anything that accepts a stream of single bits, most significant bit of each byte first.
pub trait BitSink {
    fn write_bit(&mut self, bit: u8) -> Result<()>;

    /// Writes `code` starting from the bit closest to the root.
    fn write_code(&mut self, code: &PrefixCode) -> Result<()> {
        for bit in code.bits() {
            self.write_bit(bit)?;
        }
        Ok(())
    }
}

/// Anything that yields single bits until its logical end. `Ok(None)` marks the end of the
/// stream, errors are reserved for storage failures.
pub trait BitSource {
    fn read_bit(&mut self) -> Result<Option<u8>>;

    fn bits_read(&self) -> u64;
}

pub struct BitWriter<W: Write> {
    writer: W,
    buffer: u8,
    index: u8,
    bytes_written: u64,
}

pub struct BitReader<R: Read + Seek> {
    reader: R,
    buffer: u8,
    index: u8,
    // Number of bytes before the trailer, and how many of them have been loaded so far.
    data_len: u64,
    loaded: u64,
    // Valid bits in the final data byte, 0 meaning all eight.
    valid_bits: u8,
    bits_read: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            index: 0,
            bytes_written: 0,
        }
    }

    pub fn bits_written(&self) -> u64 {
        self.bytes_written * 8 + u64::from(self.index)
    }

    /// Emits the pending partial byte (if any) followed by the trailer byte, and hands back the
    /// inner writer. The trailer is written even when the stream is byte aligned.
    pub fn finish(mut self) -> Result<W> {
        if self.index > 0 {
            self.writer.write_all(&[self.buffer])?;
            self.bytes_written += 1;
        }

        self.writer.write_all(&[self.index])?;
        self.writer.flush()?;

        log::trace!(
            "bit writer finished: {} data bytes, trailer {}",
            self.bytes_written,
            self.index
        );

        Ok(self.writer)
    }
}

impl<W: Write> BitSink for BitWriter<W> {
    fn write_bit(&mut self, bit: u8) -> Result<()> {
        if bit > 1 {
            return Err(HuffError::InvalidBit(bit));
        }

        let mask = 1u8 << (7 - self.index);
        let buffer = if bit == 1 {
            self.buffer | mask
        } else {
            self.buffer & !mask
        };

        // State only moves forward once the full byte has reached the writer.
        if self.index == 7 {
            self.writer.write_all(&[buffer])?;
            self.bytes_written += 1;
            self.buffer = 0;
            self.index = 0;
        } else {
            self.buffer = buffer;
            self.index += 1;
        }

        Ok(())
    }
}

impl<R: Read + Seek> BitReader<R> {
    /// Reads the trailer at the end of `reader` and positions it back at the first data byte.
    pub fn new(mut reader: R) -> Result<Self> {
        let size = reader.seek(SeekFrom::End(0))?;
        if size == 0 {
            return Err(HuffError::MissingTrailer);
        }

        reader.seek(SeekFrom::End(-1))?;
        let mut trailer = [0u8; 1];
        reader.read_exact(&mut trailer)?;
        let trailer = trailer[0];

        let data_len = size - 1;
        if trailer > 7 || (trailer != 0 && data_len == 0) {
            return Err(HuffError::InvalidTrailer { trailer, data_len });
        }

        reader.rewind()?;

        Ok(Self {
            reader,
            buffer: 0,
            index: 0,
            data_len,
            loaded: 0,
            valid_bits: trailer,
            bits_read: 0,
        })
    }

    /// Number of meaningful bits in the stream, trailer excluded.
    pub fn total_bits(&self) -> u64 {
        if self.valid_bits == 0 {
            self.data_len * 8
        } else {
            (self.data_len - 1) * 8 + u64::from(self.valid_bits)
        }
    }
}

impl<R: Read + Seek> BitSource for BitReader<R> {
    fn read_bit(&mut self) -> Result<Option<u8>> {
        // Every data byte is loaded: stop once the last one is used up, or at its valid-bit mark.
        if self.loaded == self.data_len && (self.index == 0 || self.index == self.valid_bits) {
            return Ok(None);
        }

        if self.index == 0 {
            let mut byte = [0u8; 1];
            self.reader.read_exact(&mut byte)?;
            self.buffer = byte[0];
            self.loaded += 1;
        }

        let mask = 1u8 << (7 - self.index);
        self.index = (self.index + 1) % 8;
        self.bits_read += 1;

        Ok(Some(u8::from(self.buffer & mask != 0)))
    }

    fn bits_read(&self) -> u64 {
        self.bits_read
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

impl FromStr for Mode {
    type Err = HuffError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Mode::Read),
            "w" => Ok(Mode::Write),
            other => Err(HuffError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Read => write!(f, "read"),
            Mode::Write => write!(f, "write"),
        }
    }
}

/// A compressed file opened in one direction. The handle is released when the stream is closed
/// or dropped; only [`BitStream::close`] writes the final partial byte and trailer.
pub enum BitStream {
    Reader(BitReader<BufReader<File>>),
    Writer(BitWriter<BufWriter<File>>),
}

impl BitStream {
    /// Opens `path` with mode `"r"` or `"w"`.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        Self::open_with_mode(path, mode.parse()?)
    }

    pub fn open_with_mode(path: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        let path = path.as_ref();
        let open_error = |source: std::io::Error| HuffError::Open {
            path: path.to_path_buf(),
            source,
        };

        let stream = match mode {
            Mode::Read => {
                let file = File::open(path).map_err(open_error)?;
                BitStream::Reader(BitReader::new(BufReader::new(file))?)
            }
            Mode::Write => {
                let file = File::create(path).map_err(open_error)?;
                BitStream::Writer(BitWriter::new(BufWriter::new(file)))
            }
        };

        log::debug!("opened {} for {}", path.display(), mode);

        Ok(stream)
    }

    pub fn mode(&self) -> Mode {
        match self {
            BitStream::Reader(_) => Mode::Read,
            BitStream::Writer(_) => Mode::Write,
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            BitStream::Reader(_) => Ok(()),
            BitStream::Writer(writer) => writer.finish().map(drop),
        }
    }
}

impl BitSink for BitStream {
    fn write_bit(&mut self, bit: u8) -> Result<()> {
        match self {
            BitStream::Writer(writer) => writer.write_bit(bit),
            BitStream::Reader(_) => Err(HuffError::WrongDirection {
                operation: "write a bit",
                mode: Mode::Read,
            }),
        }
    }
}

impl BitSource for BitStream {
    fn read_bit(&mut self) -> Result<Option<u8>> {
        match self {
            BitStream::Reader(reader) => reader.read_bit(),
            BitStream::Writer(_) => Err(HuffError::WrongDirection {
                operation: "read a bit",
                mode: Mode::Write,
            }),
        }
    }

    fn bits_read(&self) -> u64 {
        match self {
            BitStream::Reader(reader) => reader.bits_read(),
            BitStream::Writer(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    fn write_bits(bits: &[u8]) -> Vec<u8> {
        let mut writer = BitWriter::new(Vec::new());
        for &bit in bits {
            writer.write_bit(bit).unwrap();
        }
        writer.finish().unwrap()
    }

    /// Refuses the first write, then accepts everything.
    #[derive(Default)]
    struct FailOnce {
        failed: bool,
        bytes: Vec<u8>,
    }

    impl Write for FailOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::other("disk full"));
            }
            self.bytes.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn read_all(bytes: Vec<u8>) -> Vec<u8> {
        let mut reader = BitReader::new(Cursor::new(bytes)).unwrap();
        let mut bits = Vec::new();
        while let Some(bit) = reader.read_bit().unwrap() {
            bits.push(bit);
        }
        bits
    }

    #[test]
    fn test_partial_byte_gets_trailer_count() {
        assert_eq!(write_bits(&[1, 0, 1]), vec![0b1010_0000, 3]);
        assert_eq!(
            write_bits(&[1, 1, 1, 1, 0, 0, 0, 0, 1]),
            vec![0b1111_0000, 0b1000_0000, 1]
        );
    }

    #[test]
    fn test_aligned_stream_still_has_trailer() {
        assert_eq!(write_bits(&[0, 1, 0, 1, 0, 1, 0, 1]), vec![0x55, 0]);
        assert_eq!(write_bits(&[]), vec![0]);
    }

    #[test]
    fn test_invalid_bit_rejected() {
        let mut writer = BitWriter::new(Vec::new());
        let err = writer.write_bit(2).unwrap_err();
        assert!(matches!(err, HuffError::InvalidBit(2)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn test_trailer_only_stream_is_empty() {
        let mut reader = BitReader::new(Cursor::new(vec![0x00])).unwrap();
        assert_eq!(reader.total_bits(), 0);
        assert_eq!(reader.read_bit().unwrap(), None);
        assert_eq!(reader.read_bit().unwrap(), None);
    }

    #[test]
    fn test_reader_stops_at_valid_bits() {
        assert_eq!(read_all(vec![0b1010_0000, 3]), vec![1, 0, 1]);
        assert_eq!(read_all(vec![0xFF, 0b0100_0000, 2]).len(), 10);
        assert_eq!(read_all(vec![0xFF, 0]), vec![1; 8]);
    }

    #[test]
    fn test_round_trip_odd_lengths() {
        for len in [1usize, 7, 8, 9, 15, 16, 17, 63] {
            let bits: Vec<u8> = (0..len).map(|i| ((i * 7 + 3) % 5 % 2) as u8).collect();
            assert_eq!(read_all(write_bits(&bits)), bits, "length {len}");
        }
    }

    #[test]
    fn test_missing_and_invalid_trailer() {
        let err = BitReader::new(Cursor::new(Vec::new())).err().unwrap();
        assert!(matches!(err, HuffError::MissingTrailer));
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);

        let err = BitReader::new(Cursor::new(vec![0xAB, 9])).err().unwrap();
        assert!(matches!(err, HuffError::InvalidTrailer { trailer: 9, .. }));
        assert_eq!(err.kind(), ErrorKind::CorruptStream);

        let err = BitReader::new(Cursor::new(vec![5])).err().unwrap();
        assert!(matches!(
            err,
            HuffError::InvalidTrailer {
                trailer: 5,
                data_len: 0
            }
        ));
    }

    #[test]
    fn test_failed_byte_write_keeps_writer_usable() {
        let mut writer = BitWriter::new(FailOnce::default());
        for _ in 0..7 {
            writer.write_bit(1).unwrap();
        }

        let err = writer.write_bit(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
        assert_eq!(writer.bits_written(), 7);

        // The eighth bit goes through on the retry.
        writer.write_bit(1).unwrap();
        writer.write_bit(0).unwrap();
        assert_eq!(writer.bits_written(), 9);

        let bytes = writer.finish().unwrap().bytes;
        assert_eq!(bytes, vec![0xFF, 0b0000_0000, 1]);
        assert_eq!(read_all(bytes), vec![1, 1, 1, 1, 1, 1, 1, 1, 0]);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("r".parse::<Mode>().unwrap(), Mode::Read);
        assert_eq!("w".parse::<Mode>().unwrap(), Mode::Write);

        let err = "rw".parse::<Mode>().unwrap_err();
        assert!(matches!(err, HuffError::InvalidMode(ref mode) if mode == "rw"));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_file_stream_directions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.huff");

        let mut stream = BitStream::open(&path, "w").unwrap();
        assert_eq!(stream.mode(), Mode::Write);
        for bit in [1, 1, 0, 1] {
            stream.write_bit(bit).unwrap();
        }
        let err = stream.read_bit().unwrap_err();
        assert!(matches!(
            err,
            HuffError::WrongDirection {
                mode: Mode::Write,
                ..
            }
        ));
        stream.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![0b1101_0000, 4]);

        let mut stream = BitStream::open(&path, "r").unwrap();
        let err = stream.write_bit(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut bits = Vec::new();
        while let Some(bit) = stream.read_bit().unwrap() {
            bits.push(bit);
        }
        assert_eq!(bits, vec![1, 1, 0, 1]);
        assert_eq!(stream.bits_read(), 4);
        stream.close().unwrap();
    }

    #[test]
    fn test_open_missing_file_for_read() {
        let dir = tempfile::tempdir().unwrap();
        let err = BitStream::open(dir.path().join("missing.huff"), "r")
            .err()
            .unwrap();
        assert!(matches!(err, HuffError::Open { .. }));
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }
}
