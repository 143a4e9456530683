//! Minecraft Anvil region file format (.mca).
//!
//! Region files contain 32x32 chunks in a specific binary format:
//! - Bytes 0-4095: Location table (1024 entries × 4 bytes)
//! - Bytes 4096-8191: Timestamp table (1024 entries × 4 bytes)
//! - Bytes 8192+: Chunk data, each payload framed as
//!   `[length: u32 BE][compression tag: u8][length - 1 bytes of body]`

pub mod frame;
pub mod header;

pub use frame::{CompressionScheme, PayloadFrame};
pub use header::SectorLocation;

use serde::Serialize;

/// Size of one sector in bytes (4 KB).
pub const SECTOR_SIZE: usize = 4096;

/// Total header size (location table + timestamp table).
pub const HEADER_SIZE: usize = SECTOR_SIZE * 2; // 8192 bytes

/// Number of chunks per region dimension.
pub const REGION_SIZE: i32 = 32;

/// Entries in the location table.
pub const CHUNKS_PER_REGION: usize = (REGION_SIZE * REGION_SIZE) as usize;

/// Convert chunk coordinates to local region coordinates (0-31).
#[inline]
pub fn chunk_to_local(chunk_coord: i32) -> i32 {
    chunk_coord.rem_euclid(REGION_SIZE)
}

/// Convert chunk coordinates to region coordinates.
#[inline]
pub fn chunk_to_region(chunk_coord: i32) -> i32 {
    chunk_coord.div_euclid(REGION_SIZE)
}

/// Calculate linear index for a chunk within a region (0-1023).
#[inline]
pub fn local_to_index(local_x: i32, local_z: i32) -> usize {
    (local_z * REGION_SIZE + local_x) as usize
}

/// Calculate file offset for a sector number.
#[inline]
pub fn sector_to_offset(sector: u32) -> usize {
    sector as usize * SECTOR_SIZE
}

/// How the caller's chunk coordinates are meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoordConvention {
    /// Already region-local, both values in 0..=31.
    Local,
    /// World chunk coordinates, reduced to the region with euclidean modulo.
    Absolute,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("region-local coordinate {value} for {axis} is outside 0..=31")]
pub struct CoordError {
    pub axis: &'static str,
    pub value: i32,
}

/// A chunk coordinate pair together with its convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkCoords {
    pub cx: i32,
    pub cz: i32,
    pub coords: CoordConvention,
}

impl ChunkCoords {
    pub fn local(cx: i32, cz: i32) -> Self {
        Self { cx, cz, coords: CoordConvention::Local }
    }

    pub fn absolute(cx: i32, cz: i32) -> Self {
        Self { cx, cz, coords: CoordConvention::Absolute }
    }

    /// Region-local coordinates, rejecting out-of-range local input instead of
    /// silently wrapping it.
    pub fn to_local(&self) -> Result<(i32, i32), CoordError> {
        match self.coords {
            CoordConvention::Absolute => Ok((chunk_to_local(self.cx), chunk_to_local(self.cz))),
            CoordConvention::Local => {
                for (axis, value) in [("cx", self.cx), ("cz", self.cz)] {
                    if !(0..REGION_SIZE).contains(&value) {
                        return Err(CoordError { axis, value });
                    }
                }
                Ok((self.cx, self.cz))
            }
        }
    }

    /// Index into the location table (0-1023).
    pub fn table_index(&self) -> Result<usize, CoordError> {
        let (x, z) = self.to_local()?;
        Ok(local_to_index(x, z))
    }

    /// Region containing these coordinates, only known for absolute input.
    pub fn region(&self) -> Option<RegionPos> {
        match self.coords {
            CoordConvention::Absolute => {
                Some(RegionPos::new(chunk_to_region(self.cx), chunk_to_region(self.cz)))
            }
            CoordConvention::Local => None,
        }
    }
}

/// Region file coordinates (parsed from filename like "r.0.-1.mca").
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Parse region position from filename (e.g., "r.0.-1.mca").
    pub fn from_filename(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() == 4 && parts[0] == "r" && parts[3] == "mca" {
            let x = parts[1].parse().ok()?;
            let z = parts[2].parse().ok()?;
            Some(Self { x, z })
        } else {
            None
        }
    }

    /// Convert local chunk coordinates to world chunk coordinates.
    pub fn local_to_world(&self, local_x: i32, local_z: i32) -> (i32, i32) {
        (
            self.x * REGION_SIZE + local_x,
            self.z * REGION_SIZE + local_z,
        )
    }
}
