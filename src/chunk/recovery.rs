//! Magic-byte recovery scan.
//!
//! When the declared framing or decompression fails, the bytes around the
//! declared location are searched for the self-describing headers of zlib
//! and gzip streams. Each candidate is decoded from its own offset to the end
//! of the file, so neither the length prefix nor the compression tag is
//! trusted. Candidates are tried in ascending offset order and the first
//! stream that decodes completely wins.

use crate::chunk::compression::{Inflated, inflate_gzip, inflate_zlib};
use crate::diagnostics::Diagnostics;
use crate::error::ExtractError;
use crate::region::{CompressionScheme, HEADER_SIZE, SECTOR_SIZE, SectorLocation};

/// Default number of bytes scanned past the reserved sectors.
pub const DEFAULT_SCAN_MARGIN: usize = SECTOR_SIZE;

/// Byte range searched for stream headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: usize,
    pub end: usize,
}

impl ScanWindow {
    /// Reserved sectors of `location` plus `margin`, clamped to the region
    /// body and the file.
    pub fn around(location: &SectorLocation, margin: usize, file_len: usize) -> Self {
        let start = location.byte_offset().max(HEADER_SIZE).min(file_len);
        let end = location
            .reserved_end()
            .saturating_add(margin)
            .min(file_len)
            .max(start);
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A position where a compressed stream might begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub offset: usize,
    pub scheme: CompressionScheme,
}

/// zlib `CMF FLG`: deflate method, window <= 32K, no preset dictionary and
/// the header checksum holds.
pub fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == 8 && cmf >> 4 <= 7 && flg & 0x20 == 0 && (cmf as u16 * 256 + flg as u16) % 31 == 0
}

/// gzip ID1 ID2.
pub fn is_gzip_header(id1: u8, id2: u8) -> bool {
    id1 == 0x1F && id2 == 0x8B
}

/// Iterator over stream header candidates inside a window, earliest first.
///
/// A header's second byte may lie just past the window end.
pub struct Candidates<'a> {
    region: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Candidates<'a> {
    pub fn new(region: &'a [u8], window: ScanWindow) -> Self {
        Self {
            region,
            pos: window.start,
            end: window.end,
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while self.pos < self.end && self.pos + 1 < self.region.len() {
            let offset = self.pos;
            let (a, b) = (self.region[offset], self.region[offset + 1]);
            self.pos += 1;

            if is_zlib_header(a, b) {
                return Some(Candidate { offset, scheme: CompressionScheme::Zlib });
            }
            if is_gzip_header(a, b) {
                return Some(Candidate { offset, scheme: CompressionScheme::Gzip });
            }
        }
        None
    }
}

/// Payload found by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub candidate: Candidate,
    pub inflated: Inflated,
}

/// Scan the window around `location` and return the first candidate that
/// decodes without error.
pub fn scan(
    region: &[u8],
    location: &SectorLocation,
    margin: usize,
    diag: &mut Diagnostics,
) -> Result<Recovered, ExtractError> {
    let window = ScanWindow::around(location, margin, region.len());
    if window.is_empty() {
        diag.warn(
            "recovery.window",
            format!("empty at byte {}, reserved sectors lie past end of file", window.start),
        );
    } else {
        diag.ok("recovery.window", format!("bytes {}..{}", window.start, window.end));
    }

    let mut tried = 0;
    for candidate in Candidates::new(region, window) {
        tried += 1;
        let input = &region[candidate.offset..];
        let attempt = match candidate.scheme {
            CompressionScheme::Gzip => inflate_gzip(input),
            _ => inflate_zlib(input),
        };
        match attempt {
            Ok(inflated) => {
                diag.ok(
                    "recovery.candidate",
                    format!(
                        "{} stream at byte {}: {} compressed -> {} bytes",
                        candidate.scheme.name(),
                        candidate.offset,
                        inflated.consumed,
                        inflated.bytes.len()
                    ),
                );
                return Ok(Recovered { candidate, inflated });
            }
            Err(e) => diag.reject(
                "recovery.candidate",
                format!("{} stream at byte {}: {}", candidate.scheme.name(), candidate.offset, e),
            ),
        }
    }

    Err(ExtractError::RecoveryExhausted {
        candidates: tried,
        start: window.start,
        end: window.end,
    })
}
