/// Extract New: finds canonical entities missing from the live dataset and
/// groups them into review batches.
///
/// Usage: extract_new [--config <pipeline.ron>] [--canonical <dir>] [--batch-size <n>] [--improvements <json>]

use anyhow::{Context, Result};
use clap::Parser;
use dungeon_canon::config::PipelineConfig;
use dungeon_canon::core::live::{self, LiveDataset};
use dungeon_canon::core::pipeline::{artifacts, CanonicalSet};
use dungeon_canon::core::reconcile::{self, Batch};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "extract_new", about = "Extract canonical entities the live dataset lacks")]
struct Cli {
    /// RON pipeline config.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding decode output (overrides the config file).
    #[arg(long)]
    canonical: Option<PathBuf>,
    /// Entities per review batch.
    #[arg(long)]
    batch_size: Option<usize>,
    /// JSON map of canonical id to improved name (overrides the config file).
    #[arg(long)]
    improvements: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())
        .context("failed to load pipeline config")?;
    if let Some(dir) = cli.canonical {
        config.output_dir = dir;
    }
    if let Some(n) = cli.batch_size {
        config.batch_size = n;
    }
    if cli.improvements.is_some() {
        config.improvements = cli.improvements;
    }

    let (rooms, objects) = CanonicalSet::load_entities(&config.output_dir)
        .context("canonical artifacts missing; run decode first")?;
    let live_rooms = LiveDataset::load(&config.live_rooms).context("failed to load live rooms")?;
    let live_objects =
        LiveDataset::load(&config.live_objects).context("failed to load live objects")?;

    let improvements = reconcile::load_improvements(config.improvements.as_deref())
        .context("failed to load improvements")?;

    let extraction = reconcile::extract(&rooms, &objects, &live_rooms, &live_objects, &improvements);
    let categories = reconcile::categorize(&extraction, config.batch_size);

    let out = &config.output_dir;
    live::write_json(&out.join(artifacts::NEW_ROOMS), &extraction.new_rooms)?;
    live::write_json(&out.join(artifacts::NEW_OBJECTS), &extraction.new_objects)?;
    live::write_json(&out.join(artifacts::EXTRACTION_STATS), &extraction.stats)?;
    live::write_json(&out.join(artifacts::CATEGORIES), &categories)?;

    let s = &extraction.stats;
    println!("\n=== Extraction Report ===\n");
    println!(
        "Rooms:   {} canonical, {} live, {} already present, {} placeholders skipped, {} new",
        s.canonical_rooms, s.live_rooms, s.existing_rooms, s.skipped_placeholder_rooms, s.new_rooms
    );
    println!(
        "Objects: {} canonical, {} live, {} already present, {} unnamed skipped, {} new",
        s.canonical_objects,
        s.live_objects,
        s.existing_objects,
        s.skipped_unnamed_objects,
        s.new_objects
    );

    print_batches("rooms", &categories.rooms);
    print_batches("objects", &categories.objects);

    println!("\nWrote artifacts to {}", out.display());
    Ok(())
}

fn print_batches(kind: &str, batches: &[Batch]) {
    println!("\n--- New {} by category ---\n", kind);
    if batches.is_empty() {
        println!("  (none)");
        return;
    }
    for batch in batches {
        println!(
            "  {:<11} batch {:>2}: {}",
            batch.category,
            batch.number,
            batch.ids.join(", ")
        );
    }
}
