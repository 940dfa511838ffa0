//! Renders the digest as the categorized JSON interchange file and as a
//! plain-text budget report.
//!
//! The JSON mirrors the structure consumed by downstream tooling: a
//! `Statistics` object followed by one object per category (subcategory →
//! entry list, in taxonomy order) and the `Uncategorized` entry list.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Map, Value};

use crate::engine::{Bucket, Digest, Statistics};
use crate::error::Error;

const DISPLAY_DATE_FORMAT: &str = "%d-%b-%Y";

/// Writes the categorized data JSON next to the other report files.
pub fn write_json(digest: &Digest, file: &Path) -> Result<(), Error> {
    let value = to_json(digest);
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    fs::write(file, buffer)?;
    Ok(())
}

/// Writes the plain-text budget report.
pub fn write_text(digest: &Digest, currency: &str, file: &Path) -> Result<(), Error> {
    fs::write(file, render_text(digest, currency))?;
    Ok(())
}

pub fn to_json(digest: &Digest) -> Value {
    let mut root = Map::new();
    root.insert(
        "Statistics".to_owned(),
        statistics_json(&digest.statistics),
    );
    for category in &digest.categories {
        let mut subcategories = Map::new();
        for bucket in &category.subcategories {
            subcategories.insert(bucket.name.clone(), entries_json(bucket));
        }
        root.insert(category.name.clone(), Value::Object(subcategories));
    }
    root.insert(
        digest.uncategorized.name.clone(),
        entries_json(&digest.uncategorized),
    );
    Value::Object(root)
}

fn statistics_json(statistics: &Statistics) -> Value {
    let most_expensive_day = match &statistics.most_expensive_day {
        Some(day) => json!({"Date": iso_date(day.date), "Amount": money(day.amount)}),
        None => json!({"Date": Value::Null, "Amount": 0.0}),
    };
    let highest_spending_item = match &statistics.highest_spending_item {
        Some(item) => {
            json!({"Description": item.description, "Total Amount": money(item.amount)})
        }
        None => json!({"Description": Value::Null, "Total Amount": 0.0}),
    };

    json!({
        "Total Income": money(statistics.total_income),
        "Total Expenses": money(statistics.total_expenses),
        "Total Transactions": statistics.transaction_count,
        "Starting Balance": money(statistics.starting_balance),
        "Ending Balance": money(statistics.ending_balance),
        "Average Daily Spending": money(statistics.average_daily_spending),
        "Average Daily Income": money(statistics.average_daily_income),
        "Most Expensive Day": most_expensive_day,
        "Item with Highest Total Spending": highest_spending_item,
    })
}

fn entries_json(bucket: &Bucket) -> Value {
    Value::Array(
        bucket
            .entries
            .iter()
            .map(|entry| {
                json!({
                    "Date": iso_date(entry.date),
                    "Description": entry.description,
                    "Amount": money(entry.amount),
                })
            })
            .collect(),
    )
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Amounts are already rounded to two decimal places, so the round-trip
/// through f64 keeps the JSON holding plain numbers.
fn money(value: Decimal) -> Value {
    value.to_f64().map(Value::from).unwrap_or(Value::Null)
}

/// Renders the multi-section text report: overview statistics first, then
/// one breakdown section per category and the uncategorized leftovers.
pub fn render_text(digest: &Digest, currency: &str) -> String {
    let mut out = String::new();
    push_heading(&mut out, "Budget Report");
    out.push_str(
        "Generated from your bank statement exports. Double-check the figures \
         against the original statements before relying on them.\n\n",
    );

    out.push_str(&render_overview(&digest.statistics, currency));

    for category in &digest.categories {
        push_heading(&mut out, &category.name);
        for bucket in &category.subcategories {
            render_bucket(&mut out, bucket, currency);
        }
    }

    push_heading(&mut out, &digest.uncategorized.name);
    render_bucket_entries(&mut out, &digest.uncategorized, currency);

    out
}

/// Overview section, also printed to stdout with `--print-stats`.
pub fn render_overview(statistics: &Statistics, currency: &str) -> String {
    let mut out = String::new();
    push_heading(&mut out, "Overview");

    let mut line = |label: &str, amount: Decimal| {
        let _ = writeln!(out, "{label:<30} {amount:>12.2} {currency}");
    };
    line("Total Income", statistics.total_income);
    line("Total Expenses", statistics.total_expenses);
    line("Starting Balance", statistics.starting_balance);
    line("Ending Balance", statistics.ending_balance);
    line("Average Daily Spending", statistics.average_daily_spending);
    line("Average Daily Income", statistics.average_daily_income);
    let _ = writeln!(
        out,
        "{:<30} {:>12}",
        "Total Transactions", statistics.transaction_count
    );

    match &statistics.most_expensive_day {
        Some(day) => {
            let _ = writeln!(
                out,
                "{:<30} {:>12.2} {currency} on {}",
                "Most Expensive Day",
                day.amount,
                day.date.format(DISPLAY_DATE_FORMAT)
            );
        }
        None => {
            let _ = writeln!(out, "{:<30} {:>12}", "Most Expensive Day", "-");
        }
    }
    match &statistics.highest_spending_item {
        Some(item) => {
            let _ = writeln!(
                out,
                "{:<30} {:>12.2} {currency} on '{}'",
                "Highest Spending Item", item.amount, item.description
            );
        }
        None => {
            let _ = writeln!(out, "{:<30} {:>12}", "Highest Spending Item", "-");
        }
    }
    out.push('\n');
    out
}

fn render_bucket(out: &mut String, bucket: &Bucket, currency: &str) {
    let _ = writeln!(out, "{}:", bucket.name);
    render_bucket_entries(out, bucket, currency);
}

fn render_bucket_entries(out: &mut String, bucket: &Bucket, currency: &str) {
    if bucket.entries.is_empty() {
        out.push_str("  (no transactions)\n\n");
        return;
    }
    for entry in &bucket.entries {
        let _ = writeln!(
            out,
            "  {}  {:>12.2} {currency}  {}",
            entry.date.format(DISPLAY_DATE_FORMAT),
            entry.amount,
            entry.description
        );
    }
    let _ = writeln!(
        out,
        "  {:<11}  {:>12.2} {currency}",
        "Subtotal",
        bucket.subtotal()
    );
    out.push('\n');
}

fn push_heading(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.len()));
    out.push_str("\n\n");
}
