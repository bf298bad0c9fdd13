//! Ledger aggregations: category spend, monthly balance series and
//! daily/monthly spend.
//!
//! Every function takes the ledger by reference and returns a fresh value.
//! Month keys are `YearMonth`, so `BTreeMap` iteration is chronological.

use crate::schema::{BalanceMode, MonthlyBalancePoint, Transaction, TransactionKind, YearMonth};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

fn withdrawals(ledger: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    ledger
        .iter()
        .filter(|t| t.kind == TransactionKind::Withdrawal)
}

/// Total withdrawal amount per category. Categories without withdrawals are
/// absent rather than zero.
pub fn category_spend(ledger: &[Transaction]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for t in withdrawals(ledger) {
        *totals.entry(t.category.clone()).or_default() += t.amount;
    }
    totals
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalanceSeries {
    pub points: Vec<MonthlyBalancePoint>,
    /// Rows skipped because their date could not be parsed
    pub undated_rows: usize,
    /// Dated rows skipped because their closing balance was not numeric
    pub missing_balance_rows: usize,
}

/// Collapses closing balances into one value per month.
///
/// `Last` takes the chronologically last transaction of the month; rows on
/// the same date keep statement order, so the later row wins.
pub fn monthly_balance(ledger: &[Transaction], mode: BalanceMode) -> MonthlyBalanceSeries {
    let mut undated_rows = 0;
    let mut missing_balance_rows = 0;

    // (sort key of the latest row, latest balance, running sum, count)
    let mut months: BTreeMap<YearMonth, ((NaiveDate, usize), f64, f64, usize)> = BTreeMap::new();

    for (position, t) in ledger.iter().enumerate() {
        let Some(date) = t.date else {
            undated_rows += 1;
            continue;
        };
        let Some(balance) = t.closing_balance else {
            missing_balance_rows += 1;
            continue;
        };

        let key = (date, position);
        let entry = months
            .entry(YearMonth::from_date(date))
            .or_insert((key, balance, 0.0, 0));
        if key >= entry.0 {
            entry.0 = key;
            entry.1 = balance;
        }
        entry.2 += balance;
        entry.3 += 1;
    }

    let points = months
        .into_iter()
        .map(|(month, (_, last, sum, count))| MonthlyBalancePoint {
            month,
            balance: match mode {
                BalanceMode::Last => last,
                BalanceMode::Average => sum / count as f64,
            },
        })
        .collect::<Vec<_>>();

    debug!(
        "Monthly balance series ({:?}): {} months, {} undated rows, {} rows without balance",
        mode,
        points.len(),
        undated_rows,
        missing_balance_rows
    );

    MonthlyBalanceSeries {
        points,
        undated_rows,
        missing_balance_rows,
    }
}

/// Withdrawal totals per calendar date. Undated rows are skipped.
pub fn daily_spend(ledger: &[Transaction]) -> BTreeMap<NaiveDate, f64> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for t in withdrawals(ledger) {
        if let Some(date) = t.date {
            *totals.entry(date).or_default() += t.amount;
        }
    }
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendMode {
    /// Sum of the month's withdrawals
    Total,
    /// Mean of the month's per-day withdrawal totals, over days with spend
    MeanDaily,
}

pub fn monthly_spend(ledger: &[Transaction], mode: SpendMode) -> BTreeMap<YearMonth, f64> {
    let mut per_month: BTreeMap<YearMonth, (f64, usize)> = BTreeMap::new();
    for (date, total) in daily_spend(ledger) {
        let entry = per_month.entry(YearMonth::from_date(date)).or_default();
        entry.0 += total;
        entry.1 += 1;
    }

    per_month
        .into_iter()
        .map(|(month, (sum, days))| {
            let value = match mode {
                SpendMode::Total => sum,
                SpendMode::MeanDaily => sum / days as f64,
            };
            (month, value)
        })
        .collect()
}

/// Sum of `withdrawal_amount` per month across every dated row, so months
/// that only saw deposits are present with 0.
pub fn monthly_withdrawal_totals(ledger: &[Transaction]) -> BTreeMap<YearMonth, f64> {
    let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for t in ledger {
        if let Some(date) = t.date {
            *totals.entry(YearMonth::from_date(date)).or_default() += t.withdrawal_amount;
        }
    }
    totals
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_expenditure: f64,
    pub total_income: f64,
    pub category_spend: BTreeMap<String, f64>,
    /// Largest withdrawals, ties kept in statement order
    pub top_expenses: Vec<Transaction>,
    /// Mean of per-day withdrawal totals over all days with spend
    pub average_daily_spending: Option<f64>,
    /// Distinct non-blank raw narrations that no keyword matched, in
    /// first-seen order
    pub uncategorized_narrations: Vec<String>,
}

pub fn summarize(ledger: &[Transaction], fallback_category: &str, top_n: usize) -> LedgerSummary {
    let total_expenditure = withdrawals(ledger).map(|t| t.amount).sum();
    let total_income = ledger
        .iter()
        .filter(|t| t.kind == TransactionKind::Deposit)
        .map(|t| t.amount)
        .sum();

    let mut top_expenses: Vec<Transaction> = withdrawals(ledger).cloned().collect();
    top_expenses.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    top_expenses.truncate(top_n);

    let daily = daily_spend(ledger);
    let average_daily_spending = if daily.is_empty() {
        None
    } else {
        Some(daily.values().sum::<f64>() / daily.len() as f64)
    };

    let mut seen = HashSet::new();
    let uncategorized_narrations = ledger
        .iter()
        .filter(|t| t.category == fallback_category && !t.narration.trim().is_empty())
        .filter(|t| seen.insert(t.narration.as_str()))
        .map(|t| t.narration.clone())
        .collect();

    LedgerSummary {
        total_expenditure,
        total_income,
        category_spend: category_spend(ledger),
        top_expenses,
        average_daily_spending,
        uncategorized_narrations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn txn(
        date: Option<NaiveDate>,
        withdrawal: f64,
        deposit: f64,
        balance: Option<f64>,
        category: &str,
    ) -> Transaction {
        let kind = if withdrawal > 0.0 {
            TransactionKind::Withdrawal
        } else if deposit > 0.0 {
            TransactionKind::Deposit
        } else {
            TransactionKind::Unknown
        };
        Transaction {
            source_row: 0,
            date,
            value_date: date,
            narration: format!("{} txn", category),
            reference: String::new(),
            withdrawal_amount: withdrawal,
            deposit_amount: deposit,
            closing_balance: balance,
            amount: withdrawal.max(deposit),
            kind,
            narration_clean: format!("{} txn", category),
            category: category.to_string(),
        }
    }

    fn sample_ledger() -> Vec<Transaction> {
        vec![
            txn(Some(d(2023, 1, 3)), 0.0, 50_000.0, Some(60_000.0), "salary"),
            txn(Some(d(2023, 1, 5)), 200.0, 0.0, Some(59_800.0), "food"),
            txn(Some(d(2023, 1, 5)), 300.0, 0.0, Some(59_500.0), "food"),
            txn(Some(d(2023, 1, 20)), 1_000.0, 0.0, Some(58_500.0), "shopping"),
            txn(None, 75.0, 0.0, Some(58_425.0), "others"),
            txn(Some(d(2023, 2, 1)), 0.0, 0.0, None, "others"),
            txn(Some(d(2023, 2, 10)), 0.0, 1_000.0, Some(59_425.0), "transfer"),
            txn(Some(d(2023, 3, 2)), 425.0, 0.0, Some(59_000.0), "fuel"),
        ]
    }

    #[test]
    fn test_category_spend_sums_to_total_withdrawals() {
        let ledger = sample_ledger();
        let spend = category_spend(&ledger);

        assert_eq!(spend.get("food"), Some(&500.0));
        assert_eq!(spend.get("others"), Some(&75.0));
        assert!(!spend.contains_key("salary"));
        assert!(!spend.contains_key("entertainment"));

        let total_withdrawals: f64 = ledger
            .iter()
            .filter(|t| t.kind == TransactionKind::Withdrawal)
            .map(|t| t.amount)
            .sum();
        let spend_total: f64 = spend.values().sum();
        assert!((spend_total - total_withdrawals).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_balance_last_and_average() {
        let ledger = sample_ledger();

        let last = monthly_balance(&ledger, BalanceMode::Last);
        assert_eq!(last.undated_rows, 1);
        assert_eq!(last.missing_balance_rows, 1);
        assert_eq!(
            last.points,
            vec![
                MonthlyBalancePoint {
                    month: ym(2023, 1),
                    balance: 58_500.0,
                },
                MonthlyBalancePoint {
                    month: ym(2023, 2),
                    balance: 59_425.0,
                },
                MonthlyBalancePoint {
                    month: ym(2023, 3),
                    balance: 59_000.0,
                },
            ]
        );

        let average = monthly_balance(&ledger, BalanceMode::Average);
        let jan = average.points[0].balance;
        assert!((jan - (60_000.0 + 59_800.0 + 59_500.0 + 58_500.0) / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_balance_uses_chronology_not_row_order() {
        let ledger = vec![
            txn(Some(d(2023, 1, 31)), 10.0, 0.0, Some(900.0), "x"),
            txn(Some(d(2023, 1, 2)), 10.0, 0.0, Some(100.0), "x"),
            txn(Some(d(2023, 1, 31)), 10.0, 0.0, Some(880.0), "x"),
        ];
        let series = monthly_balance(&ledger, BalanceMode::Last);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].balance, 880.0);
    }

    #[test]
    fn test_mean_daily_spend_uses_daily_totals() {
        let ledger = sample_ledger();

        let daily = daily_spend(&ledger);
        assert_eq!(daily.get(&d(2023, 1, 5)), Some(&500.0));

        let totals = monthly_spend(&ledger, SpendMode::Total);
        assert_eq!(totals.get(&ym(2023, 1)), Some(&1_500.0));
        assert!(!totals.contains_key(&ym(2023, 2)));

        // Two spend days in January: 500 and 1000. A per-transaction mean
        // would give 500 instead.
        let mean = monthly_spend(&ledger, SpendMode::MeanDaily);
        assert_eq!(mean.get(&ym(2023, 1)), Some(&750.0));
    }

    #[test]
    fn test_monthly_withdrawal_totals_include_deposit_only_months() {
        let totals = monthly_withdrawal_totals(&sample_ledger());
        assert_eq!(totals.get(&ym(2023, 1)), Some(&1_500.0));
        assert_eq!(totals.get(&ym(2023, 2)), Some(&0.0));
        assert_eq!(totals.get(&ym(2023, 3)), Some(&425.0));
    }

    #[test]
    fn test_summary() {
        let ledger = sample_ledger();
        let summary = summarize(&ledger, "others", 2);

        assert_eq!(summary.total_expenditure, 2_000.0);
        assert_eq!(summary.total_income, 51_000.0);
        assert_eq!(summary.top_expenses.len(), 2);
        assert_eq!(summary.top_expenses[0].amount, 1_000.0);
        assert_eq!(summary.top_expenses[1].amount, 425.0);
        // Spend days: Jan 5 (500), Jan 20 (1000), Mar 2 (425)
        let avg = summary.average_daily_spending.unwrap();
        assert!((avg - 1_925.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.uncategorized_narrations, vec!["others txn".to_string()]);
    }

    #[test]
    fn test_empty_ledger() {
        let summary = summarize(&[], "others", 10);
        assert_eq!(summary.total_expenditure, 0.0);
        assert!(summary.average_daily_spending.is_none());
        assert!(monthly_balance(&[], BalanceMode::Last).points.is_empty());
    }

    #[test]
    fn test_blank_narrations_are_not_reported_as_uncategorized() {
        let mut separator = txn(None, 0.0, 0.0, None, "others");
        separator.narration = String::new();
        let mut padded = txn(Some(d(2023, 1, 9)), 0.0, 0.0, None, "others");
        padded.narration = "   ".to_string();
        let ledger = vec![
            separator,
            padded,
            txn(Some(d(2023, 1, 10)), 40.0, 0.0, Some(10.0), "others"),
        ];

        let summary = summarize(&ledger, "others", 5);
        assert_eq!(summary.uncategorized_narrations, vec!["others txn".to_string()]);
    }
}
