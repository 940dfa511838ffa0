//! Categorization and summary statistics over a normalized ledger.
//!
//! One pass in ledger order does both jobs: every transaction is checked
//! against every (category, subcategory) keyword leaf, and the running
//! aggregates are updated along the way. Classification is deliberately
//! non-exclusive: a transaction whose description matches keywords in several
//! leaves lands in all of them, so per-category totals may overlap and do not
//! have to sum to the grand total. Only a transaction matching no leaf at all
//! goes into the reserved Uncategorized bucket.
//!
//! Currency amounts accumulate at full precision and are rounded to two
//! decimal places exactly once, when the statistics record is finalized.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::Error;
use crate::ingest::Transaction;
use crate::taxonomy::Taxonomy;

/// Name of the reserved bucket for transactions matching no keyword leaf.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A transaction as recorded in a bucket: income positive, spending negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

/// The ordered list of entries assigned to one taxonomy leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Bucket {
    fn new(name: &str) -> Self {
        Bucket {
            name: name.to_owned(),
            entries: Vec::new(),
        }
    }

    /// Signed sum of the entries, rounded for display.
    pub fn subtotal(&self) -> Decimal {
        self.entries
            .iter()
            .map(|entry| entry.amount)
            .sum::<Decimal>()
            .round_dp(2)
    }
}

/// One taxonomy category with its subcategory buckets, in taxonomy order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBuckets {
    pub name: String,
    pub subcategories: Vec<Bucket>,
}

/// The calendar day with the largest summed expense.
#[derive(Debug, Clone, PartialEq)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// The description with the largest summed expense across the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTotal {
    pub description: String,
    pub amount: Decimal,
}

/// Finalized aggregates of one run. All amounts are rounded to two decimal
/// places; the two maxima are `None` when the ledger holds no expenses.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub transaction_count: usize,
    pub starting_balance: Decimal,
    pub ending_balance: Decimal,
    pub average_daily_spending: Decimal,
    pub average_daily_income: Decimal,
    pub most_expensive_day: Option<DayTotal>,
    pub highest_spending_item: Option<ItemTotal>,
}

/// Output of one engine run, handed to the report and chart renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub statistics: Statistics,
    pub categories: Vec<CategoryBuckets>,
    pub uncategorized: Bucket,
}

/// Classifies the ledger against the taxonomy and derives its statistics.
///
/// The ledger must already be in chronological order; it is not re-sorted,
/// and entries keep ledger order within each bucket. A row carrying both an
/// expense and an income amount is rejected: the signed bucket amount would
/// be ambiguous for such a row.
pub fn digest(ledger: &[Transaction], taxonomy: &Taxonomy) -> Result<Digest, Error> {
    let mut categories: Vec<CategoryBuckets> = taxonomy
        .categories
        .iter()
        .map(|category| CategoryBuckets {
            name: category.name.clone(),
            subcategories: category
                .subcategories
                .iter()
                .map(|subcategory| Bucket::new(&subcategory.name))
                .collect(),
        })
        .collect();
    let mut uncategorized = Bucket::new(UNCATEGORIZED);
    let mut accumulator = Accumulator::default();

    for (index, transaction) in ledger.iter().enumerate() {
        if transaction.expense > Decimal::ZERO && transaction.income > Decimal::ZERO {
            return Err(Error::malformed(
                format!("row {}", index + 1),
                "a transaction must not carry both an expense and an income amount",
            ));
        }

        accumulator.observe(transaction);

        let entry = Entry {
            date: transaction.date,
            description: transaction.description.clone(),
            amount: if transaction.income > Decimal::ZERO {
                transaction.income
            } else {
                -transaction.expense
            },
        };

        let upper_description = transaction.description.to_uppercase();
        let mut matched = false;
        for (buckets, rules) in categories.iter_mut().zip(&taxonomy.categories) {
            for (bucket, subcategory) in buckets.subcategories.iter_mut().zip(&rules.subcategories)
            {
                if subcategory.matches(&upper_description) {
                    bucket.entries.push(entry.clone());
                    matched = true;
                }
            }
        }
        if !matched {
            uncategorized.entries.push(entry);
        }
    }

    Ok(Digest {
        statistics: accumulator.finalize(),
        categories,
        uncategorized,
    })
}

/// Running aggregates for one pass over the ledger. Scoped to a single run
/// and consumed by [`Accumulator::finalize`].
#[derive(Debug, Default)]
struct Accumulator {
    total_income: Decimal,
    total_expenses: Decimal,
    transaction_count: usize,
    starting_balance: Option<Decimal>,
    ending_balance: Decimal,
    daily_expenses: RunningTotals<NaiveDate>,
    item_totals: RunningTotals<String>,
    distinct_dates: HashSet<NaiveDate>,
}

impl Accumulator {
    fn observe(&mut self, transaction: &Transaction) {
        if transaction.income > Decimal::ZERO {
            self.total_income += transaction.income;
        }
        if transaction.expense > Decimal::ZERO {
            self.total_expenses += transaction.expense;
            self.daily_expenses.add(transaction.date, transaction.expense);
            self.item_totals
                .add(transaction.description.clone(), transaction.expense);
        }
        self.transaction_count += 1;
        self.starting_balance.get_or_insert(transaction.balance);
        self.ending_balance = transaction.balance;
        self.distinct_dates.insert(transaction.date);
    }

    fn finalize(self) -> Statistics {
        let day_count = Decimal::from(self.distinct_dates.len());
        let (average_daily_spending, average_daily_income) = if day_count.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            (
                (self.total_expenses / day_count).round_dp(2),
                (self.total_income / day_count).round_dp(2),
            )
        };

        Statistics {
            total_income: self.total_income.round_dp(2),
            total_expenses: self.total_expenses.round_dp(2),
            transaction_count: self.transaction_count,
            starting_balance: self.starting_balance.unwrap_or_default().round_dp(2),
            ending_balance: self.ending_balance.round_dp(2),
            average_daily_spending,
            average_daily_income,
            most_expensive_day: self
                .daily_expenses
                .max_entry()
                .map(|(date, amount)| DayTotal {
                    date: *date,
                    amount: amount.round_dp(2),
                }),
            highest_spending_item: self
                .item_totals
                .max_entry()
                .map(|(description, amount)| ItemTotal {
                    description: description.clone(),
                    amount: amount.round_dp(2),
                }),
        }
    }
}

/// Sum map that remembers first-insertion order, so maxima resolve
/// deterministically: the first key seen wins a tie.
#[derive(Debug)]
struct RunningTotals<K> {
    sums: HashMap<K, Decimal>,
    order: Vec<K>,
}

impl<K> Default for RunningTotals<K> {
    fn default() -> Self {
        RunningTotals {
            sums: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> RunningTotals<K> {
    fn add(&mut self, key: K, amount: Decimal) {
        if let Some(sum) = self.sums.get_mut(&key) {
            *sum += amount;
        } else {
            self.sums.insert(key.clone(), amount);
            self.order.push(key);
        }
    }

    /// First key in insertion order holding the largest sum. Only a strictly
    /// greater sum displaces the current best.
    fn max_entry(&self) -> Option<(&K, Decimal)> {
        let mut best: Option<(&K, Decimal)> = None;
        for key in &self.order {
            let sum = self.sums[key];
            match best {
                Some((_, best_sum)) if sum <= best_sum => {}
                _ => best = Some((key, sum)),
            }
        }
        best
    }
}
