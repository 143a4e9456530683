//! mca-inspect: pull one chunk out of a Minecraft region file (.mca), even a
//! damaged one.
//!
//! The declared framing is tried first. When it is inconsistent with the
//! bytes, the sectors around the chunk are scanned for zlib/gzip stream
//! headers and each candidate is decoded on its own terms. Every value read
//! and every decision taken ends up in a [`Diagnostics`] report.

pub mod chunk;
pub mod diagnostics;
pub mod error;
pub mod inspect;
pub mod nbt;
pub mod region;

pub use chunk::{ExtractOptions, Extraction, extract};
pub use diagnostics::Diagnostics;
pub use error::{DecompressionError, ExtractError, FramingError};
pub use inspect::{ChunkReport, Inspection, inspect};
pub use nbt::{FastNbtDecoder, Tag, TagDecoder};
pub use region::{ChunkCoords, CoordConvention};
