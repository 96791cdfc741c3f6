use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use uuid::Uuid;

use netlens_core::models::ThreatList;

#[derive(Args)]
pub struct IntelArgs {
    /// Threat-list store file
    #[arg(long, default_value = "threat-lists.json", global = true)]
    pub store: PathBuf,

    #[command(subcommand)]
    pub command: IntelCommands,
}

#[derive(Subcommand)]
pub enum IntelCommands {
    /// Merge a JSON array of threat lists into the store
    Import(ImportArgs),

    /// Write the store to a JSON file
    Export(ExportArgs),

    /// Print the stored lists
    List,
}

#[derive(Args)]
pub struct ImportArgs {
    /// JSON file containing an array of threat lists
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Destination file
    #[arg(short, long, default_value = "threat-lists-export.json")]
    pub out: PathBuf,
}

pub fn run(args: IntelArgs) -> Result<()> {
    match args.command {
        IntelCommands::Import(import) => run_import(&args.store, import),
        IntelCommands::Export(export) => run_export(&args.store, export),
        IntelCommands::List => run_list(&args.store),
    }
}

/// Load the store file. A missing file is an empty store.
pub fn load_store(path: &Path) -> Result<Vec<ThreatList>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid threat-list store", path.display()))
}

fn save_store(path: &Path, store: &[ThreatList]) -> Result<()> {
    let json = serde_json::to_string_pretty(store).context("failed to serialize store")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Parse an import payload. Anything but a JSON array is rejected whole; no
/// partial import happens.
fn parse_import(payload: &str) -> Result<Vec<ThreatList>> {
    let value: serde_json::Value =
        serde_json::from_str(payload).context("payload is not valid JSON")?;
    if !value.is_array() {
        bail!("import payload must be a JSON array of threat lists");
    }
    serde_json::from_value(value).context("payload is not a valid array of threat lists")
}

/// Fill in ids the payload omitted and merge by list id, skipping ids the
/// store already holds. Returns (added, skipped).
fn merge_lists(store: &mut Vec<ThreatList>, incoming: Vec<ThreatList>) -> (usize, usize) {
    let mut added = 0;
    let mut skipped = 0;
    for mut list in incoming {
        if list.id.is_empty() {
            list.id = Uuid::new_v4().simple().to_string();
        }
        for entry in &mut list.entries {
            if entry.id.is_empty() {
                entry.id = Uuid::new_v4().simple().to_string();
            }
        }
        if store.iter().any(|l| l.id == list.id) {
            skipped += 1;
            continue;
        }
        list.date_modified = Utc::now();
        store.push(list);
        added += 1;
    }
    (added, skipped)
}

fn run_import(store_path: &Path, args: ImportArgs) -> Result<()> {
    let payload = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let incoming = parse_import(&payload)?;

    let mut store = load_store(store_path)?;
    let (added, skipped) = merge_lists(&mut store, incoming);
    save_store(store_path, &store)?;

    println!(
        "  {} {} list(s) imported, {} skipped (already present), {} total",
        console::style("intel:").cyan().bold(),
        console::style(added).green().bold(),
        skipped,
        store.len(),
    );
    Ok(())
}

fn run_export(store_path: &Path, args: ExportArgs) -> Result<()> {
    let store = load_store(store_path)?;
    save_store(&args.out, &store)?;
    println!(
        "  {} {} list(s) written to {}",
        console::style("intel:").cyan().bold(),
        console::style(store.len()).green().bold(),
        args.out.display(),
    );
    Ok(())
}

fn run_list(store_path: &Path) -> Result<()> {
    let store = load_store(store_path)?;
    if store.is_empty() {
        println!(
            "  {} store is empty",
            console::style("intel:").cyan().bold(),
        );
        return Ok(());
    }
    for list in &store {
        let active = if list.is_active {
            console::style("active").green()
        } else {
            console::style("inactive").dim()
        };
        println!(
            "  {:<10} {:<30} {} entries  [{}]",
            active,
            console::style(&list.name).bold(),
            list.entries.len(),
            list.id,
        );
    }
    Ok(())
}
