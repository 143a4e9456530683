//! Region file header reading.
//!
//! The header consists of two tables:
//! - Location table: where each chunk is stored
//! - Timestamp table: when each chunk was last saved (not used here)

use super::{CHUNKS_PER_REGION, HEADER_SIZE, SECTOR_SIZE, sector_to_offset};
use crate::diagnostics::Diagnostics;
use crate::error::ExtractError;

/// One decoded location table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLocation {
    pub index: usize,
    /// Start of the payload, in 4 KB sectors from the file start.
    pub sector_offset: u32,
    /// Number of sectors reserved for the payload.
    pub sector_count: u8,
}

impl SectorLocation {
    /// Decode a raw entry: [Offset: 3 bytes][Count: 1 byte] (Big Endian).
    pub fn from_entry(index: usize, entry: [u8; 4]) -> Self {
        let raw = u32::from_be_bytes(entry);
        Self {
            index,
            sector_offset: raw >> 8,
            sector_count: (raw & 0xFF) as u8,
        }
    }

    /// A chunk is absent iff both fields are zero.
    pub fn is_absent(&self) -> bool {
        self.sector_offset == 0 && self.sector_count == 0
    }

    /// Byte offset of the length prefix.
    #[inline]
    pub fn byte_offset(&self) -> usize {
        sector_to_offset(self.sector_offset)
    }

    /// Bytes reserved for this chunk.
    #[inline]
    pub fn reserved_len(&self) -> usize {
        self.sector_count as usize * SECTOR_SIZE
    }

    /// End of the reserved sectors (exclusive).
    #[inline]
    pub fn reserved_end(&self) -> usize {
        self.byte_offset() + self.reserved_len()
    }

    /// Sector 0 and 1 hold the tables themselves.
    pub fn overlaps_header(&self) -> bool {
        self.byte_offset() < HEADER_SIZE
    }
}

/// Look up the location table entry for `index` (0-1023).
///
/// Pure read: the same bytes and index always give the same result.
pub fn read_location(region: &[u8], index: usize) -> Result<SectorLocation, ExtractError> {
    if index >= CHUNKS_PER_REGION {
        return Err(ExtractError::IndexOutOfRange { index });
    }
    if region.len() < HEADER_SIZE {
        return Err(ExtractError::TruncatedHeader { len: region.len() });
    }

    let entry_offset = index * 4;
    let entry = [
        region[entry_offset],
        region[entry_offset + 1],
        region[entry_offset + 2],
        region[entry_offset + 3],
    ];
    let location = SectorLocation::from_entry(index, entry);

    if location.is_absent() {
        return Err(ExtractError::ChunkAbsent { index });
    }
    Ok(location)
}

/// Record the location entry and the sanity checks around it. Bounds against
/// the file are left to the frame reader.
pub fn inspect_location(location: &SectorLocation, diag: &mut Diagnostics) {
    diag.offset_sector = Some(location.sector_offset);
    diag.sector_count = Some(location.sector_count);
    diag.ok("location.sector_offset", location.sector_offset);
    diag.ok("location.sector_count", location.sector_count);

    if location.overlaps_header() {
        diag.warn(
            "location.sector_offset",
            format!(
                "sector {} lies inside the {}-byte header",
                location.sector_offset, HEADER_SIZE
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with(index: usize, entry: [u8; 4]) -> Vec<u8> {
        let mut region = vec![0u8; HEADER_SIZE];
        region[index * 4..index * 4 + 4].copy_from_slice(&entry);
        region
    }

    #[test]
    fn test_decode_entry() {
        let location = SectorLocation::from_entry(5, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(location.sector_offset, 0x010203);
        assert_eq!(location.sector_count, 4);
        assert_eq!(location.byte_offset(), 0x010203 * 4096);
    }

    #[test]
    fn test_first_chunk_location() {
        let region = header_with(0, [0, 0, 2, 1]);
        let location = read_location(&region, 0).unwrap();
        assert_eq!(location.sector_offset, 2);
        assert_eq!(location.sector_count, 1);
        assert_eq!(location.byte_offset(), 8192);
        assert!(!location.overlaps_header());
    }

    #[test]
    fn test_absent_chunk() {
        let region = header_with(0, [0, 0, 2, 1]);
        assert!(matches!(
            read_location(&region, 1),
            Err(ExtractError::ChunkAbsent { index: 1 })
        ));
    }

    #[test]
    fn test_zero_offset_with_count_is_not_absent() {
        let region = header_with(3, [0, 0, 0, 1]);
        let location = read_location(&region, 3).unwrap();
        assert!(location.overlaps_header());
    }

    #[test]
    fn test_truncated_header() {
        let region = vec![0u8; 5000];
        assert!(matches!(
            read_location(&region, 0),
            Err(ExtractError::TruncatedHeader { len: 5000 })
        ));
    }

    #[test]
    fn test_index_past_table() {
        let region = vec![0u8; HEADER_SIZE];
        assert!(matches!(
            read_location(&region, 1024),
            Err(ExtractError::IndexOutOfRange { index: 1024 })
        ));
        assert!(matches!(
            read_location(&region[..16], 4096),
            Err(ExtractError::IndexOutOfRange { index: 4096 })
        ));
    }

    #[test]
    fn test_inspect_warns_on_header_overlap() {
        let location = SectorLocation::from_entry(0, [0, 0, 1, 2]);
        let mut diag = Diagnostics::new();
        inspect_location(&location, &mut diag);
        assert_eq!(diag.offset_sector, Some(1));
        assert_eq!(diag.entries("location.sector_offset").count(), 2);
        assert!(diag.errors.is_empty());
    }
}
