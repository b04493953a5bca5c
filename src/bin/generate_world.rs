//! World generator binary - builds a terrain world from noise and saves it to a slot.
//!
//! Usage: cargo run --release --bin generate_world -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   JSON terrain config (default: built-in defaults)
//!   --seed <SEED>     Random seed (default: 12345)
//!   --scale <SCALE>   Terrain noise scale in world units (default: 48.0)
//!   --height <H>      Elevation range above the base height (default: 10.0)
//!   --water <MASS>    Liquid poured at the grid center before settling (default: 0)
//!   --ticks <N>       Simulation ticks to run before saving (default: 120)
//!   --slot <NAME>     Save slot name (default: "world")
//!   --out <DIR>       Save directory (default: "saves")
//!   --debug-port <P>  After saving, serve debug queries on this port until Ctrl-C

use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use strata_debug::{DebugHandler, DebugServer};
use tokio::sync::Mutex;

use strata::core::config::TerrainConfig;
use strata::persist::SaveStore;
use strata::terrain::{HeightMapGenerator, TerrainParams, TerrainWorld};

#[tokio::main]
async fn main() -> strata::Result<()> {
    strata::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match parse_str_arg(&args, "--config") {
        Some(path) => TerrainConfig::load(path)?,
        None => TerrainConfig::default(),
    };
    let defaults = TerrainParams::default();
    let params = TerrainParams {
        seed: parse_u32_arg(&args, "--seed").unwrap_or(defaults.seed),
        scale: parse_f32_arg(&args, "--scale").unwrap_or(defaults.scale),
        height_scale: parse_f32_arg(&args, "--height").unwrap_or(defaults.height_scale),
        ..defaults
    };
    let water = parse_f32_arg(&args, "--water").unwrap_or(0.0);
    let ticks = parse_u32_arg(&args, "--ticks").unwrap_or(120);
    let slot = parse_str_arg(&args, "--slot").unwrap_or_else(|| "world".to_string());
    let out = parse_str_arg(&args, "--out").unwrap_or_else(|| "saves".to_string());
    let debug_port = parse_u16_arg(&args, "--debug-port");

    println!("=== Strata World Generator ===");
    println!("Grid:  {} x {} cells, {} layers", config.width, config.depth, config.layers);
    println!("Seed:  {}", params.seed);
    println!("Scale: {}, Height: {}", params.scale, params.height_scale);
    println!("Slot:  {}/{}", out, slot);
    println!();

    let start = Instant::now();
    let generator = HeightMapGenerator::new(params);
    let heightmap = generator.generate(config.width, config.depth, config.cell_size);
    let (lo, hi) = heightmap.range();
    println!("Height map: {:.2}..{:.2} ({:.1?})", lo, hi, start.elapsed());

    let dt = config.liquid.step_interval();
    let mut world = TerrainWorld::new(config)?;
    world.apply_height_map(&heightmap)?;

    if water > 0.0 {
        // The top layer never flows, pour one below it.
        let dims = world.dims();
        let cfg = world.config();
        let center = Vec3::new(
            dims.width as f32 * 0.5 * cfg.cell_size,
            (dims.layers as f32 - 1.5) * cfg.cell_height,
            dims.depth as f32 * 0.5 * cfg.cell_size,
        );
        let mut remaining = water;
        while remaining > 0.0 {
            let amount = remaining.min(world.config().liquid.max_value);
            world.add_liquid_density(center, amount);
            remaining -= amount;
            world.tick(dt);
        }
    }

    let settle = Instant::now();
    let mut remeshed = 0;
    for _ in 0..ticks {
        let report = world.tick(dt);
        remeshed += report.solid_chunks_remeshed + report.liquid_chunks_remeshed;
    }
    while world.pending_remesh_count() > 0 {
        let report = world.tick(0.0);
        remeshed += report.solid_chunks_remeshed + report.liquid_chunks_remeshed;
    }
    println!(
        "Settled {} ticks: {} chunk remeshes, {} solid triangles, liquid mass {:.3} ({:.1?})",
        ticks,
        remeshed,
        world.solid_mesher().triangle_count(),
        world.total_liquid_mass(),
        settle.elapsed()
    );

    let buffer = world.save()?;
    let store = SaveStore::new(&out);
    store.save(&slot, &buffer).await?;
    println!("Saved {} bytes to {}", buffer.len(), store.slot_path(&slot).display());
    println!("Done in {:.1?}", start.elapsed());

    if let Some(port) = debug_port {
        let handler: Arc<Mutex<dyn DebugHandler>> = Arc::new(Mutex::new(world));
        let _server = DebugServer::start(handler, port);
        println!("Serving debug queries on 127.0.0.1:{} (Ctrl-C to exit)", port);
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u16_arg(args: &[String], flag: &str) -> Option<u16> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
