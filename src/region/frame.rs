//! Chunk payload framing: `[Length: 4][Type: 1][Data...]`.
//!
//! The length counts the compression tag plus the compressed body. Nothing
//! in the frame is checksummed, so every field is checked against the file
//! before it is used.

use std::fmt;

use super::SectorLocation;
use crate::diagnostics::Diagnostics;
use crate::error::FramingError;

/// Compression tags used in the Minecraft Anvil format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionScheme {
    Gzip,
    Zlib,
    Uncompressed,
    /// Payload lives in a sibling `.mcc` file.
    External,
}

impl CompressionScheme {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Gzip),
            2 => Some(Self::Zlib),
            3 => Some(Self::Uncompressed),
            4 => Some(Self::External),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Gzip => 1,
            Self::Zlib => 2,
            Self::Uncompressed => 3,
            Self::External => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
            Self::Uncompressed => "uncompressed",
            Self::External => "external",
        }
    }
}

impl fmt::Display for CompressionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag(), self.name())
    }
}

/// Size of the length prefix plus the compression tag.
pub const FRAME_HEADER_SIZE: usize = 5;

/// A payload frame whose fields are all inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadFrame {
    pub declared_length: u32,
    pub compression: CompressionScheme,
    pub body_start: usize,
    pub body_len: usize,
}

impl PayloadFrame {
    pub fn body<'a>(&self, region: &'a [u8]) -> &'a [u8] {
        &region[self.body_start..self.body_start + self.body_len]
    }
}

/// Read and validate the frame at `location`.
///
/// Every failure is recorded in `diag` with the offending field and its raw
/// bytes before it is returned.
pub fn read_frame(
    region: &[u8],
    location: &SectorLocation,
    diag: &mut Diagnostics,
) -> Result<PayloadFrame, FramingError> {
    let start = location.byte_offset();
    let file_len = region.len();

    if location.overlaps_header() {
        let err = FramingError::OutOfBounds {
            field: "sector_offset",
            start,
            end: start + FRAME_HEADER_SIZE,
            file_len,
        };
        diag.reject("frame.sector_offset", format!("{} -> {}", location.sector_offset, err));
        return Err(err);
    }

    let header_end = start + FRAME_HEADER_SIZE;
    if header_end > file_len {
        let err = FramingError::OutOfBounds {
            field: "length prefix",
            start,
            end: header_end,
            file_len,
        };
        let readable = &region[start.min(file_len)..];
        diag.reject("frame.length", format!("raw {} -> {}", hex::encode(readable), err));
        return Err(err);
    }

    let raw_length = [region[start], region[start + 1], region[start + 2], region[start + 3]];
    let declared_length = u32::from_be_bytes(raw_length);
    diag.length = Some(declared_length);
    let tag = region[start + 4];
    diag.compression_byte = Some(tag);

    if declared_length == 0 {
        let err = FramingError::NegativeBodyLength;
        diag.reject("frame.length", format!("raw {} -> {}", hex::encode(raw_length), err));
        return Err(err);
    }
    diag.ok("frame.length", declared_length);

    let body_start = header_end;
    let body_len = declared_length as usize - 1;
    let body_end = body_start + body_len;
    if body_end > file_len {
        let err = FramingError::OutOfBounds {
            field: "body",
            start: body_start,
            end: body_end,
            file_len,
        };
        diag.reject("frame.length", format!("raw {} -> {}", hex::encode(raw_length), err));
        return Err(err);
    }

    // Some valid files have slightly mismatched sector bookkeeping, so this
    // is only a warning.
    if location.reserved_len() < declared_length as usize + 4 {
        diag.warn(
            "frame.sector_count",
            format!(
                "{} sector(s) = {} bytes cannot hold declared length {} + 4",
                location.sector_count,
                location.reserved_len(),
                declared_length
            ),
        );
    }

    let reserved_end = location.reserved_end();
    if reserved_end > file_len {
        let err = FramingError::OutOfBounds {
            field: "sector_count",
            start,
            end: reserved_end,
            file_len,
        };
        diag.reject("frame.sector_count", format!("{} -> {}", location.sector_count, err));
        return Err(err);
    }

    let Some(compression) = CompressionScheme::from_tag(tag) else {
        let err = FramingError::UnknownCompressionTag {
            tag,
            offset: start + 4,
            body_start,
            body_len,
        };
        diag.reject("frame.compression_tag", format!("raw {:02x} -> {}", tag, err));
        return Err(err);
    };
    diag.ok("frame.compression_tag", compression);

    Ok(PayloadFrame {
        declared_length,
        compression,
        body_start,
        body_len,
    })
}
