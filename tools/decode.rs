/// Decode: decrypts and parses the data file into canonical JSON artifacts.
///
/// Usage: decode <datafile> [--output <dir>] [--config <pipeline.ron>] [--name-max-len <n>] [--header-only]

use anyhow::{Context, Result};
use clap::Parser;
use dungeon_canon::config::PipelineConfig;
use dungeon_canon::core::datafile::{self, TextLocation};
use dungeon_canon::core::pipeline::{CanonicalSet, Pipeline};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "decode", about = "Decode the encrypted data file into canonical JSON")]
struct Cli {
    /// Path to the encrypted data file.
    datafile: PathBuf,
    /// Directory for the JSON artifacts (overrides the config file).
    #[arg(long)]
    output: Option<PathBuf>,
    /// RON pipeline config.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Longest generated display name.
    #[arg(long)]
    name_max_len: Option<usize>,
    /// Only locate the text section and print the header; writes nothing.
    #[arg(long)]
    header_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())
        .context("failed to load pipeline config")?;
    if let Some(dir) = cli.output {
        config.output_dir = dir;
    }
    if let Some(n) = cli.name_max_len {
        config.name_max_len = n;
    }

    if cli.header_only {
        let bytes = std::fs::read(&cli.datafile)
            .with_context(|| format!("failed to read {}", cli.datafile.display()))?;
        let location = datafile::locate_text(&bytes)
            .with_context(|| format!("failed to locate text in {}", cli.datafile.display()))?;
        print_location(&location, bytes.len());
        return Ok(());
    }

    let set = Pipeline::from_config(&config)
        .decode_file(&cli.datafile)
        .with_context(|| format!("failed to decode {}", cli.datafile.display()))?;
    let written = set
        .write_to(&config.output_dir)
        .with_context(|| format!("failed to write artifacts to {}", config.output_dir.display()))?;

    print_report(&set, &written);
    Ok(())
}

fn print_location(location: &TextLocation, file_len: usize) {
    println!("\n=== Header Report ===\n");
    println!("Version:        {}", location.header.version());
    println!("Max score:      {}", location.header.max_score);
    println!("Endgame score:  {}", location.header.endgame_max_score);
    println!("Messages:       {} (base {})", location.message_refs.len(), location.message_base);
    println!(
        "Text:           {} bytes at offset {}",
        file_len.saturating_sub(location.text_offset),
        location.text_offset
    );
}

fn print_report(set: &CanonicalSet, written: &[PathBuf]) {
    let h = &set.header;
    let r = &set.report;

    println!("\n=== Decode Report ===\n");
    println!("Version:        {}", h.version);
    println!("Max score:      {}", h.header.max_score);
    println!("Endgame score:  {}", h.header.endgame_max_score);
    println!(
        "Sections:       {} rooms, {} travel words, {} objects, {} room2, {} clock events, {} villains, {} adventurers",
        h.counts.rooms,
        h.counts.travel,
        h.counts.objects,
        h.counts.room2,
        h.counts.clock_events,
        h.counts.villains,
        h.counts.adventurers
    );
    println!(
        "Text:           {} bytes at offset {} ({:.1}% printable)",
        h.text_bytes,
        h.text_offset,
        h.printable_ratio * 100.0
    );
    println!("Messages:       {}", h.counts.messages);

    println!("\n--- Conversion ---\n");
    println!("Rooms:               {}", r.rooms);
    println!("Objects:             {}", r.objects);
    println!("Placeholder rooms:   {}", r.placeholder_rooms);
    println!("Unnamed objects:     {}", r.unnamed_objects);
    println!("Truncated names:     {}", r.truncated_names);
    println!("Id collisions:       {}", r.id_collisions);
    println!("Unknown directions:  {}", r.unknown_directions);
    println!("Blocked exits:       {}", r.blocked_exits);
    println!("Unresolved exits:    {}", r.unresolved_exits.len());
    for exit in r.unresolved_exits.iter().take(10) {
        println!(
            "  room {} {} -> {} (as {})",
            exit.room, exit.direction, exit.destination, exit.fallback_id
        );
    }
    println!("Dangling references: {}", r.dangling_references.len());
    for dangling in r.dangling_references.iter().take(10) {
        println!("  {} = {}", dangling.owner, dangling.reference);
    }

    println!("\nWrote {} files:", written.len());
    for path in written {
        println!("  {}", path.display());
    }
}
