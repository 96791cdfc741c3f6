use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use netlens_core::models::{AnalysisResult, RecommendationKind, RiskLevel};
use netlens_core::score::{self, RiskBand};
use netlens_core::{analysis, parse};

use super::intel::load_store;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the snapshot file (netstat / ss output)
    pub snapshot: PathBuf,

    /// Output directory for report.json
    #[arg(short, long, default_value = "case")]
    pub out: PathBuf,

    /// Threat-list store file (JSON array of lists)
    #[arg(long, default_value = "threat-lists.json")]
    pub intel: PathBuf,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let started = Instant::now();

    // 1. Parse
    println!(
        "  {} {}",
        console::style("[1/3] parsing").cyan().bold(),
        args.snapshot.display(),
    );
    let content = fs::read_to_string(&args.snapshot)
        .with_context(|| format!("failed to read {}", args.snapshot.display()))?;
    let snapshot = parse::parse_snapshot(&content);
    println!(
        "        {} connections ({} format)",
        console::style(snapshot.connections.len()).green().bold(),
        snapshot.format,
    );

    // 2. Analyze
    println!("  {}", console::style("[2/3] analyzing").cyan().bold());
    let store = load_store(&args.intel)?;
    let active: Vec<_> = store.iter().filter(|l| l.is_active).cloned().collect();
    if !active.is_empty() {
        let entries: usize = active.iter().map(|l| l.entries.len()).sum();
        println!(
            "        {} active threat list(s), {} indicators",
            console::style(active.len()).green().bold(),
            entries,
        );
    }

    let result = analysis::analyze(&snapshot.connections, snapshot.format, &active);
    if let Some(err) = &result.error {
        println!(
            "  {} {}",
            console::style("warning:").yellow().bold(),
            err,
        );
    } else {
        print_summary(&result);
    }

    // 3. Write report
    println!("  {}", console::style("[3/3] writing report").cyan().bold());
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let report_path = args.out.join("report.json");
    let json = serde_json::to_string_pretty(&result).context("failed to serialize report")?;
    fs::write(&report_path, json)
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    println!(
        "        {} ({:.2}s)",
        console::style(report_path.display()).green().bold(),
        started.elapsed().as_secs_f64(),
    );

    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    let s = &result.summary;
    println!(
        "        {} safe, {} warning, {} suspicious, {} critical",
        console::style(s.safe).green(),
        console::style(s.warning).yellow(),
        console::style(s.suspicious).magenta(),
        console::style(s.critical).red().bold(),
    );

    if let Some(overall) = score::overall_risk(result) {
        let styled = match overall.band {
            RiskBand::Critical => console::style(overall.headline).red().bold(),
            RiskBand::High => console::style(overall.headline).red(),
            RiskBand::Medium => console::style(overall.headline).yellow().bold(),
            RiskBand::Low => console::style(overall.headline).yellow(),
            RiskBand::Minimal => console::style(overall.headline).green().bold(),
        };
        println!("\n  {styled}");
        println!("  {}\n", console::style(&overall.detail).dim());
    }

    if !result.listening_ports.is_empty() {
        println!("  {}", console::style("listening ports").cyan().bold());
        for lp in result.listening_ports.iter().take(10) {
            let risk = match lp.risk {
                RiskLevel::Critical => console::style(lp.risk.label()).red().bold(),
                RiskLevel::Suspicious => console::style(lp.risk.label()).magenta(),
                RiskLevel::Warning => console::style(lp.risk.label()).yellow(),
                _ => console::style(lp.risk.label()).green(),
            };
            println!(
                "        {:<12} {:<18} {:<6} {}",
                risk,
                lp.address,
                lp.protocol,
                lp.service,
            );
        }
        if result.listening_ports.len() > 10 {
            println!(
                "        ... and {} more",
                result.listening_ports.len() - 10
            );
        }
        println!();
    }

    if !result.recommendations.is_empty() {
        println!("  {}", console::style("recommendations").cyan().bold());
        for rec in &result.recommendations {
            let tag = match rec.kind {
                RecommendationKind::Critical => console::style("[critical]").red().bold(),
                RecommendationKind::Warning => console::style("[warning] ").yellow(),
            };
            println!("        {} {}", tag, console::style(&rec.title).bold());
        }
        println!();
    }
}
