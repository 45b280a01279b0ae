/// Merge Batch: appends one reviewed batch of new entities to the live
/// dataset, after backing it up.
///
/// Usage: merge_batch <rooms|objects> --category <name> [--batch <n>] [--config <pipeline.ron>]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dungeon_canon::config::PipelineConfig;
use dungeon_canon::core::live::{self, LiveDataset};
use dungeon_canon::core::pipeline::artifacts;
use dungeon_canon::core::reconcile::{self, Categories, Mergeable};
use dungeon_canon::schema::entity::{CanonicalObject, CanonicalRoom};
use dungeon_canon::schema::report::MergeReport;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Rooms,
    Objects,
}

#[derive(Parser)]
#[command(name = "merge_batch", about = "Merge one batch of new entities into the live dataset")]
struct Cli {
    /// Which live file to extend.
    kind: Kind,
    /// Category to take the batch from (e.g. regular, sacred, light).
    #[arg(long)]
    category: String,
    /// 1-based batch number within the category.
    #[arg(long, default_value_t = 1)]
    batch: usize,
    /// RON pipeline config.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON map of canonical id to improved name (overrides the config file).
    #[arg(long)]
    improvements: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())
        .context("failed to load pipeline config")?;
    if cli.improvements.is_some() {
        config.improvements = cli.improvements.clone();
    }

    let report = match cli.kind {
        Kind::Rooms => run::<CanonicalRoom>(
            &config,
            &config.live_rooms,
            artifacts::NEW_ROOMS,
            &cli,
        )?,
        Kind::Objects => run::<CanonicalObject>(
            &config,
            &config.live_objects,
            artifacts::NEW_OBJECTS,
            &cli,
        )?,
    };

    println!("\n=== Merge Report ===\n");
    println!("Batch:      {} #{}", cli.category, cli.batch);
    println!("Added:      {}", report.added.len());
    for id in &report.added {
        println!("  + {}", id);
    }
    println!("Duplicates: {}", report.skipped_duplicates.len());
    for id in &report.skipped_duplicates {
        println!("  = {}", id);
    }
    println!("Renamed:    {}", report.renamed);
    println!("Total now:  {}", report.total_after);
    match &report.backup {
        Some(path) => println!("Backup:     {}", path),
        None => println!("Nothing merged; live file untouched."),
    }
    Ok(())
}

fn run<T: Mergeable + DeserializeOwned>(
    config: &PipelineConfig,
    live_path: &Path,
    artifact: &str,
    cli: &Cli,
) -> Result<MergeReport> {
    // Every input is read before anything is written.
    let new: Vec<T> = live::read_json(&config.output_dir.join(artifact))
        .context("new-entity artifact missing; run extract_new first")?;
    let categories = Categories::load(&config.output_dir.join(artifacts::CATEGORIES))
        .context("reviewed batches missing; run extract_new first")?;
    let mut live = LiveDataset::load(live_path)
        .with_context(|| format!("failed to load live dataset {}", live_path.display()))?;
    let improvements = reconcile::load_improvements(config.improvements.as_deref())
        .context("failed to load improvements")?;

    let selected = match categories.batch(T::KIND, &cli.category, cli.batch) {
        Some(batch) => reconcile::select(&new, batch),
        None => {
            log::warn!(
                "no batch {} in category '{}'; nothing to merge",
                cli.batch,
                cli.category
            );
            Vec::new()
        }
    };
    let report = reconcile::merge_batch(&mut live, &selected, &improvements, &config.backup_dir)
        .with_context(|| format!("failed to merge into {}", live_path.display()))?;
    Ok(report)
}
