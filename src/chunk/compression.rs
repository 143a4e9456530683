//! Chunk body decompression.
//!
//! Supports GZip (1), ZLib (2) and None (3). Tag 4 points at an external
//! file and is refused. A stream only counts as decoded when its own end
//! marker (and checksum) has been reached; anything produced before an error
//! is handed back inside the error as evidence.

use std::io::Read;

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::{DecompressionError, ExtractError};
use crate::region::CompressionScheme;

/// Fully decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inflated {
    pub bytes: Vec<u8>,
    /// Input bytes that made up the stream, trailer included.
    pub consumed: usize,
}

/// Decompress `body` according to `scheme`.
pub fn decompress(scheme: CompressionScheme, body: &[u8]) -> Result<Inflated, ExtractError> {
    match scheme {
        CompressionScheme::Uncompressed => Ok(Inflated {
            bytes: body.to_vec(),
            consumed: body.len(),
        }),
        CompressionScheme::Zlib => Ok(inflate_zlib(body)?),
        CompressionScheme::Gzip => Ok(inflate_gzip(body)?),
        CompressionScheme::External => Err(ExtractError::ExternalPayloadUnsupported),
    }
}

/// Inflate one zlib stream starting at `input[0]`. Trailing bytes after the
/// stream end are ignored; running out of input before it is an error.
pub fn inflate_zlib(input: &[u8]) -> Result<Inflated, DecompressionError> {
    let mut inflater = Decompress::new(true);
    // Recovery hands in everything up to end of file, so the first guess is capped.
    let mut out: Vec<u8> = Vec::with_capacity(input.len().saturating_mul(4).clamp(4096, 1 << 20));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }
        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let consumed = before_in as usize;

        let result = inflater.decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish);
        let status = match result {
            Ok(status) => status,
            Err(e) => {
                return Err(DecompressionError {
                    scheme: "zlib",
                    reason: e.to_string(),
                    partial: out,
                });
            }
        };

        match status {
            Status::StreamEnd => {
                return Ok(Inflated {
                    bytes: out,
                    consumed: inflater.total_in() as usize,
                });
            }
            Status::Ok | Status::BufError => {
                let stalled =
                    inflater.total_in() == before_in && inflater.total_out() == before_out;
                let input_exhausted = inflater.total_in() as usize >= input.len();
                if (stalled || input_exhausted) && out.len() < out.capacity() {
                    return Err(DecompressionError {
                        scheme: "zlib",
                        reason: "unexpected end of stream".to_string(),
                        partial: out,
                    });
                }
            }
        }
    }
}

/// Decode the first gzip member starting at `input[0]`.
pub fn inflate_gzip(input: &[u8]) -> Result<Inflated, DecompressionError> {
    let mut decoder = flate2::bufread::GzDecoder::new(input);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => {
            let remaining = decoder.into_inner().len();
            Ok(Inflated {
                bytes: out,
                consumed: input.len() - remaining,
            })
        }
        Err(e) => Err(DecompressionError {
            scheme: "gzip",
            reason: e.to_string(),
            partial: out,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn sample() -> Vec<u8> {
        (0..20_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect()
    }

    #[test]
    fn test_uncompressed_is_identity() {
        let out = decompress(CompressionScheme::Uncompressed, b"raw nbt").unwrap();
        assert_eq!(out.bytes, b"raw nbt");
        assert_eq!(out.consumed, 7);
    }

    #[test]
    fn test_zlib_ignores_trailing_bytes() {
        let data = sample();
        let mut stream = zlib(&data);
        let stream_len = stream.len();
        stream.extend_from_slice(&[0xAB; 300]);

        let out = decompress(CompressionScheme::Zlib, &stream).unwrap();
        assert_eq!(out.bytes, data);
        assert_eq!(out.consumed, stream_len);
    }

    #[test]
    fn test_zlib_truncated_stream_fails_with_partial_output() {
        let data = sample();
        let stream = zlib(&data);
        let err = inflate_zlib(&stream[..stream.len() / 2]).unwrap_err();
        assert_eq!(err.scheme, "zlib");
        assert!(err.partial.len() < data.len());
    }

    #[test]
    fn test_zlib_checksum_mismatch_fails() {
        let data = b"checksummed chunk payload".to_vec();
        let mut stream = zlib(&data);
        let last = stream.len() - 1;
        stream[last] ^= 0xFF;
        assert!(inflate_zlib(&stream).is_err());
    }

    #[test]
    fn test_zlib_garbage_fails() {
        assert!(matches!(
            decompress(CompressionScheme::Zlib, &[0x78, 0x9C, 0xFF, 0xFF, 0xFF, 0xFF]),
            Err(ExtractError::Decompression(_))
        ));
        assert!(inflate_zlib(&[]).is_err());
    }

    #[test]
    fn test_gzip_roundtrip() {
        let data = sample();
        let mut stream = gzip(&data);
        let stream_len = stream.len();
        stream.extend_from_slice(&[0u8; 64]);

        let out = decompress(CompressionScheme::Gzip, &stream).unwrap();
        assert_eq!(out.bytes, data);
        assert_eq!(out.consumed, stream_len);
    }

    #[test]
    fn test_gzip_truncated_fails() {
        let stream = gzip(&sample());
        assert!(inflate_gzip(&stream[..stream.len() - 4]).is_err());
    }

    #[test]
    fn test_external_is_refused() {
        assert!(matches!(
            decompress(CompressionScheme::External, b"whatever"),
            Err(ExtractError::ExternalPayloadUnsupported)
        ));
    }
}
