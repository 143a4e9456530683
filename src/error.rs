//! Error taxonomy for chunk extraction.
//!
//! None of these abort a run on their own: every stage records the error in
//! the [`Diagnostics`](crate::diagnostics::Diagnostics) report and either falls
//! back to the recovery scan or ends the extraction with a report field.

use thiserror::Error;

use crate::region::HEADER_SIZE;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("region file is {len} bytes, shorter than the {}-byte header", HEADER_SIZE)]
    TruncatedHeader { len: usize },

    #[error("location table index {index} is past the 1024-entry table")]
    IndexOutOfRange { index: usize },

    #[error("location table entry {index} is empty")]
    ChunkAbsent { index: usize },

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Decompression(#[from] DecompressionError),

    #[error("payload is stored in an external chunk file, which is not read")]
    ExternalPayloadUnsupported,

    #[error("no decodable stream among {candidates} candidate(s) in bytes {start}..{end}")]
    RecoveryExhausted {
        candidates: usize,
        start: usize,
        end: usize,
    },

    #[error("tag tree decode failed: {0}")]
    TagTreeDecode(String),
}

impl ExtractError {
    /// Stable taxonomy name, used as the prefix of report error strings.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::TruncatedHeader { .. } => "TruncatedHeader",
            ExtractError::IndexOutOfRange { .. } => "IndexOutOfRange",
            ExtractError::ChunkAbsent { .. } => "ChunkAbsent",
            ExtractError::Framing(e) => e.kind(),
            ExtractError::Decompression(_) => "DecompressionError",
            ExtractError::ExternalPayloadUnsupported => "ExternalPayloadUnsupported",
            ExtractError::RecoveryExhausted { .. } => "RecoveryExhausted",
            ExtractError::TagTreeDecode(_) => "TagTreeDecodeError",
        }
    }
}

/// The declared `[length][tag][body]` framing cannot be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("{field} spans bytes {start}..{end} but the file is {file_len} bytes")]
    OutOfBounds {
        field: &'static str,
        start: usize,
        end: usize,
        file_len: usize,
    },

    #[error("declared length is 0, leaving no room for the compression tag")]
    NegativeBodyLength,

    #[error("compression tag {tag} at byte {offset} is not one of 1, 2, 3, 4")]
    UnknownCompressionTag {
        tag: u8,
        offset: usize,
        /// Body range as declared, kept so the raw bytes can still be dumped.
        body_start: usize,
        body_len: usize,
    },
}

impl FramingError {
    pub fn kind(&self) -> &'static str {
        match self {
            FramingError::OutOfBounds { .. } => "OutOfBounds",
            FramingError::NegativeBodyLength => "NegativeBodyLength",
            FramingError::UnknownCompressionTag { .. } => "UnknownCompressionTag",
        }
    }
}

/// A gzip/zlib stream that could not be decoded to its end.
#[derive(Error, Debug)]
#[error("{scheme} stream: {reason} (after {} decompressed bytes)", .partial.len())]
pub struct DecompressionError {
    pub scheme: &'static str,
    pub reason: String,
    /// Output produced before the failure. Evidence only, never a result.
    pub partial: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_taxonomy() {
        let framing = ExtractError::from(FramingError::NegativeBodyLength);
        assert_eq!(framing.kind(), "NegativeBodyLength");

        let decompression = ExtractError::from(DecompressionError {
            scheme: "zlib",
            reason: "corrupt deflate stream".to_string(),
            partial: vec![0; 3],
        });
        assert_eq!(decompression.kind(), "DecompressionError");
        assert!(decompression.to_string().contains("after 3 decompressed bytes"));

        assert_eq!(ExtractError::TruncatedHeader { len: 10 }.kind(), "TruncatedHeader");
    }
}
