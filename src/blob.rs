//! Component B: blob sniffer and decompressor.
//!
//! Identifies whether a body blob is gzip-framed and, if so, decompresses
//! it. Never fails hard: a decompression error just means the caller gets
//! the original bytes back and the decoder is left to try its luck.

use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Return the canonical decoded-body bytes for `blob`: gzip-decompressed if
/// gzip-framed, otherwise the input unchanged. Streams into a growing
/// buffer, so very large decompressed bodies are not a problem.
pub fn sniff_and_decompress(blob: &[u8]) -> Vec<u8> {
    if blob.len() >= 2 && blob[..2] == GZIP_MAGIC {
        let mut decoder = GzDecoder::new(blob);
        let mut out = Vec::with_capacity(blob.len() * 3);
        match decoder.read_to_end(&mut out) {
            Ok(_) => return out,
            Err(e) => {
                debug!(error = %e, "gzip magic present but decompression failed, trying raw bytes");
            }
        }
    }
    blob.to_vec()
}
