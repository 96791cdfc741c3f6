pub mod analyze;
pub mod intel;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "netlens",
    about = "Security risk assessment for netstat and ss snapshots",
    long_about = "netlens - parse textual connection-table dumps (netstat, ss) from\n\
                  Windows, Linux, and macOS hosts and produce a structured security\n\
                  risk assessment: listening-port exposure, threat-intel matches,\n\
                  per-IP activity, and prioritized recommendations.",
    version,
    propagate_version = true,
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a snapshot file: parse, classify, aggregate, write report
    Analyze(analyze::AnalyzeArgs),

    /// Manage threat intelligence lists (import, export, list)
    Intel(intel::IntelArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze::run(args),
        Commands::Intel(args) => intel::run(args),
    }
}

fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .usage(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .literal(
            clap::builder::styling::AnsiColor::BrightGreen
                .on_default()
                .bold(),
        )
        .placeholder(
            clap::builder::styling::AnsiColor::BrightWhite
                .on_default()
                .dimmed(),
        )
}
