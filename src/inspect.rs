//! End-to-end inspection of one chunk: extraction, tag decoding, sanity
//! cross-checks, auxiliary artifacts and the JSON report.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::chunk::{ExtractOptions, Extraction, extract};
use crate::diagnostics::{ChunkRequest, Diagnostics};
use crate::nbt::{Tag, TagDecoder, chunk_position};
use crate::region::{ChunkCoords, CoordConvention, CoordError, RegionPos, chunk_to_local};

/// The JSON document written for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkReport {
    pub diagnostics: Diagnostics,
    pub nbt: Option<Tag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub report: ChunkReport,
    pub extraction: Extraction,
    /// A payload was obtained but the tag decoder rejected it.
    pub decode_failed: bool,
}

/// Extract and decode the chunk at `coords` from `region`.
///
/// `source` is the region path as given by the caller; its file name is
/// used to check that absolute coordinates belong to this region.
pub fn inspect(
    region: &[u8],
    source: &str,
    coords: ChunkCoords,
    options: &ExtractOptions,
    decoder: &dyn TagDecoder,
) -> Result<Inspection, CoordError> {
    let index = coords.table_index()?;

    let mut diag = Diagnostics::new();
    diag.mca = Some(source.to_string());
    diag.chunk = Some(ChunkRequest {
        coords,
        index: Some(index),
    });
    diag.ok("file.length", region.len());
    let named = region_from_source(source);
    check_region_name(named, &coords, &mut diag);

    let extraction = extract(region, index, options, &mut diag);

    let mut nbt = None;
    let mut decode_failed = false;
    if let Some(payload) = &extraction.payload {
        match decoder.decode(payload) {
            Ok(tag) => {
                diag.ok("nbt", format!("decoded {} bytes with {}", payload.len(), decoder.name()));
                check_position(&tag, &coords, named, &mut diag);
                nbt = Some(tag);
            }
            Err(e) => {
                diag.fail("nbt", format!("{} bytes with {}", payload.len(), decoder.name()), &e);
                decode_failed = true;
            }
        }
    }

    Ok(Inspection {
        report: ChunkReport { diagnostics: diag, nbt },
        extraction,
        decode_failed,
    })
}

/// Region named by a `r.<x>.<z>.mca` file name, if the source has one.
fn region_from_source(source: &str) -> Option<RegionPos> {
    Path::new(source)
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(RegionPos::from_filename)
}

fn check_region_name(named: Option<RegionPos>, coords: &ChunkCoords, diag: &mut Diagnostics) {
    let (Some(expected), Some(named)) = (coords.region(), named) else {
        return;
    };
    if named != expected {
        diag.warn(
            "chunk.region",
            format!(
                "chunk ({}, {}) belongs to r.{}.{}.mca, not r.{}.{}.mca",
                coords.cx, coords.cz, expected.x, expected.z, named.x, named.z
            ),
        );
    }
}

/// World chunk coordinates the request stands for, when they are known.
fn requested_world(coords: &ChunkCoords, named: Option<RegionPos>) -> Option<(i32, i32)> {
    match coords.coords {
        CoordConvention::Absolute => Some((coords.cx, coords.cz)),
        CoordConvention::Local => Some(named?.local_to_world(coords.cx, coords.cz)),
    }
}

/// Compare xPos/zPos inside the tree with the requested chunk.
///
/// Local requests are compared in world coordinates when the file name gives
/// the region, and by their region-local parts otherwise.
fn check_position(
    root: &Tag,
    coords: &ChunkCoords,
    named: Option<RegionPos>,
    diag: &mut Diagnostics,
) {
    let Some((x, z)) = chunk_position(root) else {
        diag.ok("nbt.position", "no xPos/zPos in root or Level compound");
        return;
    };
    let (matches, wanted) = match requested_world(coords, named) {
        Some((wx, wz)) => (x == wx as i64 && z == wz as i64, (wx, wz)),
        None => (
            chunk_to_local(x as i32) == coords.cx && chunk_to_local(z as i32) == coords.cz,
            (coords.cx, coords.cz),
        ),
    };
    if matches {
        diag.ok("nbt.position", format!("({}, {})", x, z));
    } else {
        diag.warn(
            "nbt.position",
            format!(
                "tree says ({}, {}) but chunk ({}, {}) was requested",
                x, z, wanted.0, wanted.1
            ),
        );
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write the auxiliary byte dumps that apply to this run and record them.
///
/// Decompressed bytes go to `raw_nbt_out` when given, otherwise to
/// `<out>.decompressed.nbt` when they came from recovery or failed to decode.
/// The declared compressed body goes to `<out>.chunk_compressed.bin` when no
/// payload could be decompressed at all.
pub fn write_artifacts(
    inspection: &mut Inspection,
    out: &Path,
    raw_nbt_out: Option<&Path>,
) -> Vec<PathBuf> {
    let Inspection {
        report,
        extraction,
        decode_failed,
    } = inspection;
    let diag = &mut report.diagnostics;
    let mut written = Vec::new();

    let mut dump = |field: &str, path: PathBuf, bytes: &[u8], diag: &mut Diagnostics| {
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                diag.ok(field, format!("{} bytes to {}", bytes.len(), path.display()));
                written.push(path);
            }
            Err(e) => diag.warn(field, format!("could not write {}: {}", path.display(), e)),
        }
    };

    if let Some(payload) = &extraction.payload {
        let target = match raw_nbt_out {
            Some(path) => Some(path.to_path_buf()),
            None if extraction.recovered || *decode_failed => {
                Some(with_suffix(out, ".decompressed.nbt"))
            }
            None => None,
        };
        if let Some(path) = target {
            dump("artifact.decompressed", path, payload, diag);
        }
    } else if let Some(body) = &extraction.raw_body {
        dump("artifact.compressed", with_suffix(out, ".chunk_compressed.bin"), body, diag);
    }

    written
}

/// Serialize the report as pretty JSON to `out`.
pub fn write_report(report: &ChunkReport, out: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(report).context("Failed to serialize report")?;
    std::fs::write(out, json)
        .with_context(|| format!("Failed to write report to {}", out.display()))
}
