//! Normalizes raw bank statement CSV exports into the universal ledger.
//!
//! Every `Transaction_Export*.csv` file in the input folder is read with the
//! column mapping selected from `banks.json`, cleaned up and combined into
//! one chronologically sorted ledger with exact duplicates dropped. The
//! normalization is strict: the first row that cannot be turned into a
//! transaction fails the whole run.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Date format used by the raw statement exports.
const EXPORT_DATE_FORMAT: &str = "%d/%m/%Y";
/// Statement export files must match this prefix and a `.csv` extension.
const EXPORT_FILE_PREFIX: &str = "Transaction_Export";
/// Fallback key in `banks.json` when the configured bank has no mapping.
const DEFAULT_BANK: &str = "default";

/// A normalized transaction. Dates serialize as ISO-8601 in the universal
/// CSV; expense and income are non-negative, with the sign carried by which
/// of the two columns is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Expense")]
    pub expense: Decimal,
    #[serde(rename = "Income")]
    pub income: Decimal,
    #[serde(rename = "Balance")]
    pub balance: Decimal,
}

/// Source column names for one bank, resolved from `banks.json`.
///
/// The file maps bank keys to `source header → universal header` objects;
/// the universal headers are `Date`, `Description`, `Expense`, `Income` and
/// `Balance`. An unknown bank key falls back to the `default` mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    date: String,
    description: String,
    expense: String,
    income: String,
    balance: String,
}

impl ColumnMap {
    pub fn load(path: &Path, bank: &str) -> Result<ColumnMap, Error> {
        let text = fs::read_to_string(path).map_err(|err| Error::config(path, err.to_string()))?;
        let mut mappings: HashMap<String, HashMap<String, String>> =
            serde_json::from_str(&text).map_err(|err| Error::config(path, err.to_string()))?;

        let by_source = mappings
            .remove(bank)
            .or_else(|| mappings.remove(DEFAULT_BANK))
            .ok_or_else(|| {
                Error::config(
                    path,
                    format!("no mapping for bank '{bank}' and no '{DEFAULT_BANK}' fallback"),
                )
            })?;

        let source_for = |universal: &str| -> Result<String, Error> {
            by_source
                .iter()
                .find_map(|(source, target)| (target == universal).then(|| source.clone()))
                .ok_or_else(|| {
                    Error::config(
                        path,
                        format!("mapping for bank '{bank}' does not produce a '{universal}' column"),
                    )
                })
        };

        Ok(ColumnMap {
            date: source_for("Date")?,
            description: source_for("Description")?,
            expense: source_for("Expense")?,
            income: source_for("Income")?,
            balance: source_for("Balance")?,
        })
    }
}

/// Positions of the mapped columns within one export file's header row.
struct FieldIndices {
    date: usize,
    description: usize,
    expense: usize,
    income: usize,
    balance: usize,
}

impl FieldIndices {
    fn resolve(headers: &csv::StringRecord, columns: &ColumnMap, file: &Path) -> Result<Self, Error> {
        // Exports are sloppy about whitespace around header names
        let find = |source: &str| -> Result<usize, Error> {
            headers
                .iter()
                .position(|header| header.trim() == source)
                .ok_or_else(|| {
                    Error::malformed(
                        file.display().to_string(),
                        format!("missing column '{source}'; check that the csv headers match the bank mapping"),
                    )
                })
        };
        Ok(FieldIndices {
            date: find(&columns.date)?,
            description: find(&columns.description)?,
            expense: find(&columns.expense)?,
            income: find(&columns.income)?,
            balance: find(&columns.balance)?,
        })
    }
}

/// Reads all statement exports under `input_folder` and returns the combined
/// ledger, sorted ascending by date with duplicate (date, expense, income,
/// balance) rows dropped, keeping the first occurrence.
pub fn normalize_statements(
    input_folder: &Path,
    columns: &ColumnMap,
) -> Result<Vec<Transaction>, Error> {
    let files = find_export_files(input_folder)?;
    if files.is_empty() {
        return Err(Error::config(
            input_folder,
            format!("no {EXPORT_FILE_PREFIX}*.csv files found in the input folder"),
        ));
    }

    let mut ledger = Vec::new();
    for file in &files {
        read_statement(file, columns, &mut ledger)?;
    }

    // Stable sort: rows within a day keep their file order.
    ledger.sort_by_key(|transaction| transaction.date);

    let mut seen = HashSet::new();
    ledger.retain(|transaction| {
        seen.insert((
            transaction.date,
            transaction.expense,
            transaction.income,
            transaction.balance,
        ))
    });

    Ok(ledger)
}

/// Writes the normalized ledger to the universal transactions CSV.
pub fn write_universal(ledger: &[Transaction], file: &Path) -> Result<(), Error> {
    let mut writer = csv::Writer::from_path(file)?;
    for transaction in ledger {
        writer.serialize(transaction)?;
    }
    writer.flush()?;
    Ok(())
}

fn find_export_files(input_folder: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(input_folder)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.starts_with(EXPORT_FILE_PREFIX) && name.ends_with(".csv") {
            files.push(path);
        }
    }
    // Deterministic read order regardless of directory iteration order
    files.sort();
    Ok(files)
}

fn read_statement(
    file: &Path,
    columns: &ColumnMap,
    ledger: &mut Vec<Transaction>,
) -> Result<(), Error> {
    let mut reader = csv::Reader::from_path(file)?;
    let indices = FieldIndices::resolve(reader.headers()?, columns, file)?;

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // Header occupies the first line of the file
        let location = format!("{}:{}", file.display(), index + 2);

        let date_text = field(&record, indices.date, &location)?;
        if date_text.is_empty() {
            return Err(Error::malformed(&location, "missing date"));
        }
        let date = NaiveDate::parse_from_str(date_text, EXPORT_DATE_FORMAT)
            .map_err(|_| Error::malformed(&location, format!("invalid date '{date_text}'")))?;

        let description = field(&record, indices.description, &location)?;
        if description.is_empty() {
            return Err(Error::malformed(&location, "missing description"));
        }

        let expense = parse_amount(&record, indices.expense, "Expense", &location)?;
        let income = parse_amount(&record, indices.income, "Income", &location)?;
        let balance = parse_amount(&record, indices.balance, "Balance", &location)?;
        if expense < Decimal::ZERO || income < Decimal::ZERO {
            return Err(Error::malformed(
                &location,
                "expense and income amounts must not be negative",
            ));
        }

        ledger.push(Transaction {
            date,
            description: description.to_owned(),
            expense,
            income,
            balance,
        });
    }
    Ok(())
}

fn field<'r>(record: &'r csv::StringRecord, index: usize, location: &str) -> Result<&'r str, Error> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| Error::malformed(location, "row has fewer fields than the header"))
}

/// Parses a currency field, stripping thousands separators. An empty cell
/// counts as zero, matching how exports leave the unused side of an
/// expense/income pair blank.
fn parse_amount(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    location: &str,
) -> Result<Decimal, Error> {
    let text = field(record, index, location)?;
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let cleaned = text.replace(',', "");
    Decimal::from_str(&cleaned)
        .map_err(|_| Error::malformed(location, format!("invalid {name} amount '{text}'")))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use helpers::*;

    use super::*;

    #[test]
    fn should_normalize_a_single_export_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export_jan.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                "02/01/2024,\"1,250.00\",,LANDLORD LTD,\"8,750.00\"",
                "01/01/2024,,\"2,000.00\",ACME PAYROLL,\"10,000.00\"",
            ],
        );

        let ledger =
            normalize_statements(dir.path(), &danske_columns()).expect("normalized ledger");

        assert_eq!(
            vec![
                Transaction {
                    date: date(2024, 1, 1),
                    description: "ACME PAYROLL".to_owned(),
                    expense: dec!(0),
                    income: dec!(2_000.00),
                    balance: dec!(10_000.00),
                },
                Transaction {
                    date: date(2024, 1, 2),
                    description: "LANDLORD LTD".to_owned(),
                    expense: dec!(1_250.00),
                    income: dec!(0),
                    balance: dec!(8_750.00),
                },
            ],
            ledger
        );
    }

    #[test]
    fn should_combine_files_and_drop_duplicate_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export_a.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                "05/01/2024,50.00,,COFFEE SHOP,950.00",
            ],
        );
        write_export(
            dir.path(),
            "Transaction_Export_b.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                // Overlapping export: same date and amounts as in file a
                "05/01/2024,50.00,,COFFEE SHOP,950.00",
                "06/01/2024,50.00,,COFFEE SHOP,900.00",
            ],
        );

        let ledger =
            normalize_statements(dir.path(), &danske_columns()).expect("normalized ledger");

        assert_eq!(2, ledger.len());
        assert_eq!(date(2024, 1, 5), ledger[0].date);
        assert_eq!(date(2024, 1, 6), ledger[1].date);
    }

    #[test]
    fn should_ignore_files_not_matching_the_export_pattern() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                "05/01/2024,50.00,,COFFEE SHOP,950.00",
            ],
        );
        write_export(dir.path(), "notes.csv", &["Posting Date", "garbage"]);

        let ledger =
            normalize_statements(dir.path(), &danske_columns()).expect("normalized ledger");
        assert_eq!(1, ledger.len());
    }

    #[test]
    fn should_fail_when_no_export_files_are_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = normalize_statements(dir.path(), &danske_columns()).expect_err("empty folder");
        assert!(matches!(error, Error::Config { .. }));
    }

    #[test]
    fn should_fail_on_a_non_numeric_amount() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                "05/01/2024,fifty,,COFFEE SHOP,950.00",
            ],
        );

        let error = normalize_statements(dir.path(), &danske_columns()).expect_err("bad amount");
        match error {
            Error::MalformedRecord { location, message } => {
                assert!(location.ends_with("Transaction_Export.csv:2"), "{location}");
                assert_eq!("invalid Expense amount 'fifty'", message);
            }
            other => panic!("expected a malformed record error, got {other:?}"),
        }
    }

    #[test]
    fn should_fail_on_an_invalid_date() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                "2024-01-05,50.00,,COFFEE SHOP,950.00",
            ],
        );

        let error = normalize_statements(dir.path(), &danske_columns()).expect_err("bad date");
        assert!(matches!(error, Error::MalformedRecord { .. }));
    }

    #[test]
    fn should_fail_when_a_mapped_column_is_missing_from_the_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export.csv",
            &["Date,Amount,Details", "05/01/2024,50.00,COFFEE SHOP"],
        );

        let error = normalize_statements(dir.path(), &danske_columns()).expect_err("bad header");
        assert!(matches!(error, Error::MalformedRecord { .. }));
    }

    #[test]
    fn should_treat_empty_amount_cells_as_zero_and_allow_negative_balances() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                "05/01/2024,,,ANNUAL FEE NOTICE,-120.50",
            ],
        );

        let ledger =
            normalize_statements(dir.path(), &danske_columns()).expect("normalized ledger");
        assert_eq!(dec!(0), ledger[0].expense);
        assert_eq!(dec!(0), ledger[0].income);
        assert_eq!(dec!(-120.50), ledger[0].balance);
    }

    #[test]
    fn should_reject_negative_expense_or_income() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_export(
            dir.path(),
            "Transaction_Export.csv",
            &[
                "Posting Date, Debit Amount, Credit Amount,Details,Balance",
                "05/01/2024,-50.00,,COFFEE SHOP,950.00",
            ],
        );

        let error =
            normalize_statements(dir.path(), &danske_columns()).expect_err("negative expense");
        assert!(matches!(error, Error::MalformedRecord { .. }));
    }

    #[test]
    fn should_load_the_mapping_for_the_configured_bank() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_banks(dir.path());

        let columns = ColumnMap::load(&path, "DanskeBank").expect("columns");
        assert_eq!(danske_columns(), columns);
    }

    #[test]
    fn should_fall_back_to_the_default_mapping_for_an_unknown_bank() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_banks(dir.path());

        let columns = ColumnMap::load(&path, "UnknownBank").expect("columns");
        assert_eq!("Date", columns.date);
        assert_eq!("Description", columns.description);
    }

    #[test]
    fn should_fail_when_a_mapping_misses_a_universal_column() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("banks.json");
        std::fs::write(
            &path,
            r#"{"default": {"Posting Date": "Date", "Details": "Description"}}"#,
        )
        .expect("write banks.json");

        let error = ColumnMap::load(&path, "default").expect_err("incomplete mapping");
        match error {
            Error::Config { message, .. } => {
                assert_eq!(
                    "mapping for bank 'default' does not produce a 'Expense' column",
                    message
                );
            }
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn should_round_trip_the_universal_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = vec![Transaction {
            date: date(2024, 1, 1),
            description: "COFFEE SHOP".to_owned(),
            expense: dec!(5.00),
            income: dec!(0),
            balance: dec!(95.00),
        }];

        let path = dir.path().join("universal_transactions.csv");
        write_universal(&ledger, &path).expect("write universal csv");

        let mut reader = csv::Reader::from_path(&path).expect("reader");
        let read: Vec<Transaction> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(ledger, read);
    }

    mod helpers {
        use std::path::{Path, PathBuf};

        use chrono::NaiveDate;

        use super::super::ColumnMap;

        pub(super) fn danske_columns() -> ColumnMap {
            ColumnMap {
                date: "Posting Date".to_owned(),
                description: "Details".to_owned(),
                expense: "Debit Amount".to_owned(),
                income: "Credit Amount".to_owned(),
                balance: "Balance".to_owned(),
            }
        }

        pub(super) fn write_export(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, lines.join("\n")).expect("write export file");
            path
        }

        pub(super) fn write_banks(dir: &Path) -> PathBuf {
            let path = dir.join("banks.json");
            std::fs::write(
                &path,
                r#"{
                    "default": {
                        "Date": "Date",
                        "Description": "Description",
                        "Expense": "Expense",
                        "Income": "Income",
                        "Balance": "Balance"
                    },
                    "DanskeBank": {
                        "Posting Date": "Date",
                        "Details": "Description",
                        "Debit Amount": "Expense",
                        "Credit Amount": "Income",
                        "Balance": "Balance"
                    }
                }"#,
            )
            .expect("write banks.json");
            path
        }

        pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
        }
    }
}
