//! Per-extraction diagnostics report.
//!
//! One [`Diagnostics`] value is created per run and handed by `&mut` to every
//! stage. It keeps an ordered log of everything read or attempted plus the
//! summary fields of the final JSON report. Entries are mirrored to the `log`
//! facade as they are recorded.

use std::fmt::Display;

use serde::Serialize;

use crate::error::ExtractError;
use crate::region::ChunkCoords;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Warning,
    Failed,
}

/// One decision taken during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub field: String,
    pub value: String,
    pub outcome: Outcome,
}

/// Requested chunk as echoed in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkRequest {
    #[serde(flatten)]
    pub coords: ChunkCoords,
    pub index: Option<usize>,
}

/// Summary `errors` keeps at most this many; the log keeps every entry.
pub const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub mca: Option<String>,
    pub chunk: Option<ChunkRequest>,
    pub found: bool,
    pub offset_sector: Option<u32>,
    pub sector_count: Option<u8>,
    pub length: Option<u32>,
    pub compression_byte: Option<u8>,
    pub recovered_offset: Option<usize>,
    pub errors: Vec<String>,
    pub log: Vec<Entry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, field: &str, value: impl Display, outcome: Outcome) {
        let value = value.to_string();
        match outcome {
            Outcome::Ok => log::debug!("{}: {}", field, value),
            Outcome::Warning => log::warn!("{}: {}", field, value),
            Outcome::Failed => log::error!("{}: {}", field, value),
        }
        self.log.push(Entry {
            field: field.to_string(),
            value,
            outcome,
        });
    }

    pub fn ok(&mut self, field: &str, value: impl Display) {
        self.record(field, value, Outcome::Ok);
    }

    pub fn warn(&mut self, field: &str, value: impl Display) {
        self.record(field, value, Outcome::Warning);
    }

    /// Record a failed step. The error also lands in the summary `errors`
    /// while there is room.
    pub fn fail(&mut self, field: &str, value: impl Display, err: &ExtractError) {
        self.record(field, format!("{} -> {}", value, err), Outcome::Failed);
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(format!("{}: {}", err.kind(), err));
        }
    }

    /// Failed attempts that do not count as report errors (e.g. a recovery
    /// candidate that turned out not to be a stream).
    pub fn reject(&mut self, field: &str, value: impl Display) {
        self.record(field, value, Outcome::Failed);
    }

    #[cfg(test)]
    pub fn entries(&self, field: &str) -> impl Iterator<Item = &Entry> {
        self.log.iter().filter(move |e| e.field == field)
    }
}
