// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Month-by-month totals.
//!
//! Recurring rows describe an ongoing obligation, so within one month only
//! the latest occurrence of each (description, type, category) counts.
//! Installments and single rows always count on their own.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::classifier::Classifier;
use crate::models::{RecurrenceType, Transaction, TransactionType};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    /// `YYYY-MM`
    pub month_key: String,
    pub year: i32,
    pub month: u32,
    pub income_total: Decimal,
    pub expense_total: Decimal,
    /// Net voucher movement: credits minus voucher spend.
    pub food_voucher_total: Decimal,
    /// Income minus expense; voucher money is kept out of it.
    pub balance: Decimal,
    pub transactions: Vec<Transaction>,
}

impl MonthSummary {
    fn empty(year: i32, month: u32) -> Self {
        MonthSummary {
            month_key: format!("{:04}-{:02}", year, month),
            year,
            month,
            income_total: Decimal::ZERO,
            expense_total: Decimal::ZERO,
            food_voucher_total: Decimal::ZERO,
            balance: Decimal::ZERO,
            transactions: Vec::new(),
        }
    }
}

/// Drops all but the latest RECURRING row per (description, type, category)
/// in each calendar month. Ties on date keep the higher id.
pub fn dedup_recurring(transactions: &[Transaction]) -> Vec<Transaction> {
    type Key = (i32, u32, String, TransactionType, i64);
    let mut latest: HashMap<Key, (NaiveDate, i64)> = HashMap::new();
    for t in transactions
        .iter()
        .filter(|t| t.recurrence_type == RecurrenceType::Recurring)
    {
        let key = (
            t.date.year(),
            t.date.month(),
            t.description.clone(),
            t.kind,
            t.category_id,
        );
        latest
            .entry(key)
            .and_modify(|best| {
                if (t.date, t.id) > *best {
                    *best = (t.date, t.id);
                }
            })
            .or_insert((t.date, t.id));
    }
    transactions
        .iter()
        .filter(|t| {
            if t.recurrence_type != RecurrenceType::Recurring {
                return true;
            }
            let key = (
                t.date.year(),
                t.date.month(),
                t.description.clone(),
                t.kind,
                t.category_id,
            );
            latest.get(&key) == Some(&(t.date, t.id))
        })
        .cloned()
        .collect()
}

/// Groups by calendar month, newest month first, newest row first.
pub fn group_by_month(transactions: &[Transaction], classifier: &Classifier<'_>) -> Vec<MonthSummary> {
    let mut months: BTreeMap<(i32, u32), MonthSummary> = BTreeMap::new();
    for t in dedup_recurring(transactions) {
        let (y, m) = (t.date.year(), t.date.month());
        let summary = months
            .entry((y, m))
            .or_insert_with(|| MonthSummary::empty(y, m));
        let voucher = classifier.is_voucher(&t);
        match (t.kind, voucher) {
            (TransactionType::Income, false) => summary.income_total += t.amount.abs(),
            (TransactionType::Income, true) => summary.food_voucher_total += t.amount.abs(),
            (TransactionType::Expense, false) => summary.expense_total += t.amount.abs(),
            (TransactionType::Expense, true) => summary.food_voucher_total -= t.amount.abs(),
        }
        summary.transactions.push(t);
    }
    months
        .into_values()
        .rev()
        .map(|mut s| {
            s.balance = s.income_total - s.expense_total;
            s.transactions
                .sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
            s
        })
        .collect()
}

/// Summary for a single month, empty when nothing was recorded.
pub fn month_summary(
    transactions: &[Transaction],
    classifier: &Classifier<'_>,
    year: i32,
    month: u32,
) -> MonthSummary {
    group_by_month(transactions, classifier)
        .into_iter()
        .find(|s| s.year == year && s.month == month)
        .unwrap_or_else(|| MonthSummary::empty(year, month))
}
