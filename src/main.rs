use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use mca_inspect::chunk::{DEFAULT_SCAN_MARGIN, ExtractOptions};
use mca_inspect::inspect::{inspect, write_artifacts, write_report};
use mca_inspect::nbt::{FastNbtDecoder, TagDecoder};
use mca_inspect::region::{ChunkCoords, CoordConvention};

#[derive(Parser)]
#[command(
    name = "mca-inspect",
    about = "Inspect a single chunk inside an MCA region and output JSON"
)]
pub struct Args {
    /// Path to .mca region file (e.g. world/DIM1/region/r.0.0.mca)
    #[arg(long, env = "MCA_PATH")]
    pub mca: PathBuf,

    /// Chunk X
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub cx: i32,

    /// Chunk Z
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub cz: i32,

    /// Whether --cx/--cz are region-local (0-31) or absolute world chunk coordinates
    #[arg(long, value_enum, env = "MCA_COORDS")]
    pub coords: CoordConvention,

    /// Output JSON filename
    #[arg(long, default_value = "chunk_out.json")]
    pub out: PathBuf,

    /// If set, write raw decompressed NBT bytes to this file
    #[arg(long)]
    pub raw_nbt_out: Option<PathBuf>,

    /// Bytes scanned past the reserved sectors when recovering a damaged chunk
    #[arg(long, env = "MCA_SCAN_MARGIN", default_value_t = DEFAULT_SCAN_MARGIN)]
    pub scan_margin: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let coords = ChunkCoords {
        cx: args.cx,
        cz: args.cz,
        coords: args.coords,
    };
    coords.to_local().context("Invalid chunk coordinates")?;

    let decoder: Box<dyn TagDecoder> = Box::new(FastNbtDecoder);
    println!("Using NBT decoder: {}", decoder.name());
    println!("Opening region: {} chunk: ({}, {})", args.mca.display(), args.cx, args.cz);

    // The file is only held open inside fs::read.
    let region = std::fs::read(&args.mca)
        .with_context(|| format!("Failed to read region file {}", args.mca.display()))?;

    let options = ExtractOptions {
        scan_margin: args.scan_margin,
    };
    let source = args.mca.to_string_lossy();
    let mut inspection = inspect(&region, &source, coords, &options, decoder.as_ref())?;

    for path in write_artifacts(&mut inspection, &args.out, args.raw_nbt_out.as_deref()) {
        println!("Wrote {}", path.display());
    }

    let diag = &inspection.report.diagnostics;
    if diag.found {
        log::info!("Chunk found, {} error(s) recorded", diag.errors.len());
    } else {
        println!("Chunk not found or couldn't be read. See diagnostics in {}", args.out.display());
    }

    write_report(&inspection.report, &args.out)?;
    println!("Wrote report to {}", args.out.display());
    Ok(())
}
