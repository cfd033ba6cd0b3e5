//! Huffman coding over a bit-packed stream that ends with a trailer byte.
//!
//! A compressed stream is `[data bytes...][trailer]`: codes are packed most significant bit first
//! and the trailer holds how many bits of the last data byte are meaningful (0 meaning all of
//! them). The code itself is never stored; encoder and decoder rebuild it from the same
//! [`FrequencyTable`].
//!
//! ```
//! use huffpack::{Codec, FrequencyTable};
//!
//! let text = b"abracadabra";
//! let codec = Codec::from_frequencies(&FrequencyTable::from_bytes(text))?;
//!
//! let compressed = codec.encode_to_vec(text)?;
//! assert_eq!(codec.decode_from_slice(&compressed)?, text.to_vec());
//! # Ok::<(), huffpack::HuffError>(())
//! ```

pub mod bitio;
pub mod code;
pub mod codec;
pub mod error;
pub mod forest;
pub mod frequency;
pub mod tree;

pub use bitio::{BitReader, BitSink, BitSource, BitStream, BitWriter, Mode};
pub use code::{CodeTable, PrefixCode};
pub use codec::{Codec, CodecOptions, DecodeSummary, EncodeSummary};
pub use error::{ErrorKind, HuffError, Result};
pub use frequency::FrequencyTable;
pub use tree::HuffmanTree;
