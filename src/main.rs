#![warn(clippy::unwrap_used)]
#![doc = include_str!("../README.md")]

mod chart;
mod engine;
mod error;
mod ingest;
mod report;
mod settings;
mod taxonomy;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Context;
use color_eyre::Result;

use ingest::ColumnMap;
use settings::Settings;
use taxonomy::Taxonomy;

/// Turns bank statement CSV exports into a categorized budget report
#[derive(Debug, Parser)]
struct Args {
    /// Folder containing the Transaction_Export*.csv statement exports
    #[arg(long, default_value = "input")]
    input: PathBuf,
    /// Folder where the report files are written
    #[arg(long, default_value = ".")]
    output: PathBuf,
    /// Settings file with the bank key, currency and chart label interval
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,
    /// Per-bank column mappings
    #[arg(long, default_value = "banks.json")]
    banks: PathBuf,
    /// Category to subcategory to keyword taxonomy
    #[arg(long, default_value = "filter.json")]
    filter: PathBuf,
    /// Prints the overview statistics to stdout
    #[arg(long)]
    print_stats: bool,
}

fn main() -> Result<()> {
    let Args {
        input,
        output,
        settings,
        banks,
        filter,
        print_stats,
    } = Args::parse();

    let settings = Settings::load(&settings)?;
    // The taxonomy must load before any transaction is touched
    let taxonomy = Taxonomy::load(&filter)?;
    let columns = ColumnMap::load(&banks, &settings.config.bank)?;

    let ledger = ingest::normalize_statements(&input, &columns)
        .wrap_err_with(|| format!("Could not normalize the statement exports in {input:?}"))?;
    println!(
        "Loaded {} transactions for bank '{}'.",
        ledger.len(),
        settings.config.bank
    );

    ingest::write_universal(&ledger, &output.join("universal_transactions.csv"))
        .wrap_err("Could not write the universal transactions CSV")?;

    let digest = engine::digest(&ledger, &taxonomy)?;
    if print_stats {
        print!(
            "{}",
            report::render_overview(&digest.statistics, &settings.config.currency)
        );
    }

    report::write_json(&digest, &output.join("categorized_data.json"))
        .wrap_err("Could not write the categorized data JSON")?;
    report::write_text(
        &digest,
        &settings.config.currency,
        &output.join("budget_report.txt"),
    )
    .wrap_err("Could not write the budget report")?;

    let balance_chart = chart::balance_chart(
        &ledger,
        &settings.config.currency,
        settings.config.graph_interval,
    );
    chart::write_html(&balance_chart, &output.join("budget_graph.html"))
        .wrap_err("Could not write the balance chart")?;

    println!("Report files written to {output:?}.");
    Ok(())
}
