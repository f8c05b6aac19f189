//! LZ4 Compression for Photos and Archives
//!
//! Real codec behind the cleanup pipeline's photo-compression and
//! journal-archival strategies. LZ4 trades ratio for speed, which suits
//! opportunistic background maintenance on a phone.

use crate::error::{Error, Result};

/// Typical LZ4 ratio used for advisory estimates (compressed/original)
pub const TYPICAL_LZ4_RATIO: f64 = 0.5;

/// LZ4 block compressor with size-prefixed framing
#[derive(Debug, Clone, Copy, Default)]
pub struct Compressor;

impl Compressor {
    /// Create a compressor
    pub fn new() -> Self {
        Self
    }

    /// Compress a buffer; the original size is prepended so the blob is
    /// self-describing
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::compress(data, Some(lz4::block::CompressionMode::DEFAULT), true).map_err(|e| {
            Error::CompressionFailed {
                reason: e.to_string(),
            }
        })
    }

    /// Decompress a size-prefixed blob produced by [`compress`](Self::compress)
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::decompress(data, None).map_err(|e| Error::DecompressionFailed {
            reason: e.to_string(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
