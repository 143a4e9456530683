//! Chunk extraction.
//!
//! This module wires the region readers to the decompressor:
//! 1. Look the chunk up in the location table
//! 2. Read and validate the payload frame
//! 3. Decompress the body
//! 4. If 2 or 3 fails, scan the reserved sectors for a stream and retry

pub mod compression;
pub mod recovery;

pub use compression::{Inflated, decompress};
pub use recovery::{DEFAULT_SCAN_MARGIN, Recovered};

use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, FramingError};
use crate::region::frame::read_frame;
use crate::region::header::{inspect_location, read_location};

/// Tunables for one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Bytes scanned past the reserved sectors during recovery.
    pub scan_margin: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            scan_margin: DEFAULT_SCAN_MARGIN,
        }
    }
}

/// What one extraction produced. Details live in the diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Complete decompressed payload, if any.
    pub payload: Option<Vec<u8>>,
    /// Declared compressed body, kept when it could not be decompressed.
    pub raw_body: Option<Vec<u8>>,
    /// The payload came from the recovery scan.
    pub recovered: bool,
}

/// Extract the chunk at location table `index` from `region`.
///
/// Never fails: every problem is recorded in `diag`.
pub fn extract(
    region: &[u8],
    index: usize,
    options: &ExtractOptions,
    diag: &mut Diagnostics,
) -> Extraction {
    let mut extraction = Extraction::default();

    let location = match read_location(region, index) {
        Ok(location) => location,
        Err(ExtractError::ChunkAbsent { index }) => {
            diag.ok("location", format!("entry {} is empty, chunk not present", index));
            return extraction;
        }
        Err(e) => {
            diag.fail("location", format!("entry {}", index), &e);
            return extraction;
        }
    };
    inspect_location(&location, diag);

    let declared = match read_frame(region, &location, diag) {
        Ok(frame) => {
            let body = frame.body(region);
            match decompress(frame.compression, body) {
                Ok(inflated) => {
                    diag.ok(
                        "payload",
                        format!(
                            "{} body of {} bytes -> {} bytes",
                            frame.compression.name(),
                            body.len(),
                            inflated.bytes.len()
                        ),
                    );
                    diag.found = true;
                    diag.compression_byte = Some(frame.compression.tag());
                    extraction.payload = Some(inflated.bytes);
                    return extraction;
                }
                Err(e) => {
                    if let ExtractError::Decompression(d) = &e {
                        diag.reject(
                            "payload.partial",
                            format!("{} bytes decoded before the failure", d.partial.len()),
                        );
                    }
                    let at = format!(
                        "{} body at byte {}",
                        frame.compression.name(),
                        frame.body_start
                    );
                    diag.fail("payload", at, &e);
                    Some(body)
                }
            }
        }
        Err(e) => {
            let body = match &e {
                FramingError::UnknownCompressionTag { body_start, body_len, .. } => {
                    Some(&region[*body_start..*body_start + *body_len])
                }
                _ => None,
            };
            diag.fail("frame", format!("sector {}", location.sector_offset), &e.into());
            body
        }
    };

    match recovery::scan(region, &location, options.scan_margin, diag) {
        Ok(recovered) => {
            let Recovered { candidate, inflated } = recovered;
            diag.found = true;
            diag.compression_byte = Some(candidate.scheme.tag());
            diag.recovered_offset = Some(candidate.offset);
            extraction.payload = Some(inflated.bytes);
            extraction.recovered = true;
        }
        Err(e) => {
            diag.fail("recovery", "magic-byte scan", &e);
            extraction.raw_body = declared.map(<[u8]>::to_vec);
        }
    }
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::HEADER_SIZE;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn region_with(length: u32, tag: u8, body: &[u8]) -> Vec<u8> {
        let mut region = vec![0u8; HEADER_SIZE];
        region[0..4].copy_from_slice(&[0, 0, 2, 1]);
        region.extend_from_slice(&length.to_be_bytes());
        region.push(tag);
        region.extend_from_slice(body);
        region.resize(HEADER_SIZE + 4096, 0);
        region
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_declared_frame() {
        let body = zlib(b"payload");
        let region = region_with(body.len() as u32 + 1, 2, &body);
        let mut diag = Diagnostics::new();

        let out = extract(&region, 0, &ExtractOptions::default(), &mut diag);
        assert_eq!(out.payload.as_deref(), Some(&b"payload"[..]));
        assert!(!out.recovered);
        assert!(diag.found);
        assert!(diag.errors.is_empty());
        assert_eq!(diag.recovered_offset, None);
    }

    #[test]
    fn test_absent_chunk_is_not_an_error() {
        let region = region_with(1, 3, &[]);
        let mut diag = Diagnostics::new();
        let out = extract(&region, 7, &ExtractOptions::default(), &mut diag);
        assert_eq!(out, Extraction::default());
        assert!(!diag.found);
        assert!(diag.errors.is_empty());
    }

    #[test]
    fn test_short_declared_length_recovers_full_stream() {
        let body = zlib(&b"long payload".repeat(40));
        let region = region_with(10, 2, &body);
        let mut diag = Diagnostics::new();

        let out = extract(&region, 0, &ExtractOptions::default(), &mut diag);
        assert!(out.recovered);
        assert_eq!(out.payload.map(|p| p.len()), Some(480));
        assert_eq!(diag.recovered_offset, Some(HEADER_SIZE + 5));
        assert_eq!(diag.errors.len(), 1);
        assert!(diag.errors[0].starts_with("DecompressionError"));
    }

    #[test]
    fn test_unrecoverable_keeps_raw_body() {
        let region = region_with(5, 2, &[1, 2, 3, 4]);
        let mut diag = Diagnostics::new();

        let out = extract(&region, 0, &ExtractOptions::default(), &mut diag);
        assert_eq!(out.payload, None);
        assert_eq!(out.raw_body, Some(vec![1, 2, 3, 4]));
        assert!(!diag.found);
        let kinds: Vec<_> = diag.errors.iter().map(|e| e.split(':').next().unwrap()).collect();
        assert_eq!(kinds, ["DecompressionError", "RecoveryExhausted"]);
    }

    #[test]
    fn test_index_past_table_is_reported() {
        let region = vec![0u8; HEADER_SIZE];
        let mut diag = Diagnostics::new();
        let out = extract(&region, 4096, &ExtractOptions::default(), &mut diag);
        assert_eq!(out, Extraction::default());
        assert!(!diag.found);
        assert_eq!(diag.errors.len(), 1);
        assert!(diag.errors[0].starts_with("IndexOutOfRange"));
    }

    #[test]
    fn test_reserved_sectors_past_end_of_file_trigger_recovery() {
        let body = zlib(b"payload");
        let mut region = region_with(body.len() as u32 + 1, 2, &body);
        region[0..4].copy_from_slice(&[0, 0, 2, 5]);
        let mut diag = Diagnostics::new();

        let out = extract(&region, 0, &ExtractOptions::default(), &mut diag);
        assert!(out.recovered);
        assert_eq!(out.payload.as_deref(), Some(&b"payload"[..]));
        assert_eq!(diag.recovered_offset, Some(HEADER_SIZE + 5));
        assert_eq!(diag.errors.len(), 1);
        assert!(diag.errors[0].starts_with("OutOfBounds"));
        assert!(diag.errors[0].contains("sector_count"));
    }

    #[test]
    fn test_external_payload_goes_to_recovery() {
        let region = region_with(1, 4, &[]);
        let mut diag = Diagnostics::new();

        let out = extract(&region, 0, &ExtractOptions::default(), &mut diag);
        assert_eq!(out.payload, None);
        assert_eq!(out.raw_body, Some(Vec::new()));
        assert!(diag.errors[0].starts_with("ExternalPayloadUnsupported"));
        assert_eq!(diag.compression_byte, Some(4));
    }
}
