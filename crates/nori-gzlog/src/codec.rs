//! Record compression codecs.
//!
//! Frames carry no codec tag, so every reader of a file must use the codec
//! the file was written with. Zlib is the default and matches the format of
//! existing gzlog files.

use std::io::{self, Read, Write};
use thiserror::Error;

/// Zlib level used for every record.
pub const ZLIB_LEVEL: u32 = 2;

/// Zstd level used for every record.
pub const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Compression failed: {0}")]
    Compress(#[source] io::Error),
    #[error("Decompression failed: {0}")]
    Decompress(#[source] io::Error),
}

/// Compression applied to each record before framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Zlib,
    Zstd,
    Lz4,
}

impl Compression {
    /// Compresses a record at the codec's fixed level.
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Compression::Zlib => {
                let mut encoder = flate2::write::ZlibEncoder::new(
                    Vec::with_capacity(data.len() / 2 + 16),
                    flate2::Compression::new(ZLIB_LEVEL),
                );
                encoder.write_all(data).map_err(CodecError::Compress)?;
                encoder.finish().map_err(CodecError::Compress)
            }
            Compression::Zstd => zstd::encode_all(data, ZSTD_LEVEL).map_err(CodecError::Compress),
            Compression::Lz4 => lz4::block::compress(data, None, true).map_err(CodecError::Compress),
        }
    }

    /// Restores a record compressed by [`Compression::compress`].
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            Compression::Zlib => {
                let mut out = Vec::with_capacity(data.len() * 2);
                flate2::read::ZlibDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(CodecError::Decompress)?;
                Ok(out)
            }
            Compression::Zstd => zstd::decode_all(data).map_err(CodecError::Decompress),
            Compression::Lz4 => lz4::block::decompress(data, None).map_err(CodecError::Decompress),
        }
    }
}
