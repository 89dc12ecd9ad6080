// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::info;

use crate::error::{LedgerError, Result};
use crate::models::{Budget, NewBudget, Transaction, TransactionType};
use crate::monthly::dedup_recurring;
use crate::repository::RecordRepository;

pub const DEFAULT_ALERT_THRESHOLD: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertState {
    Ok,
    Near,
    Over,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent_amount: Decimal,
    pub remaining: Decimal,
    pub percentage: u32,
    pub state: AlertState,
}

/// Spend in the budget's category and month, after recurring de-dup.
pub fn spent_amount(budget: &Budget, transactions: &[Transaction]) -> Decimal {
    let in_scope: Vec<Transaction> = transactions
        .iter()
        .filter(|t| {
            t.kind == TransactionType::Expense
                && t.category_id == budget.category_id
                && t.date.year() == budget.year
                && t.date.month() == budget.month
        })
        .cloned()
        .collect();
    dedup_recurring(&in_scope)
        .iter()
        .map(|t| t.amount.abs())
        .sum()
}

/// Whole percent, half rounded up, capped at 100. Zero-amount budgets read 0;
/// a ratio too large for a decimal reads 100.
pub fn percentage(spent: Decimal, amount: Decimal) -> u32 {
    if amount <= Decimal::ZERO || spent <= Decimal::ZERO {
        return 0;
    }
    let Some(pct) = spent
        .checked_div(amount)
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
    else {
        return 100;
    };
    pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .map_or(100, |p| p.min(100))
}

pub fn alert_state(percentage: u32, threshold: u32) -> AlertState {
    if percentage >= 100 {
        AlertState::Over
    } else if percentage >= threshold {
        AlertState::Near
    } else {
        AlertState::Ok
    }
}

pub fn get_budget_status(budget: &Budget, transactions: &[Transaction]) -> BudgetStatus {
    let spent = spent_amount(budget, transactions);
    let pct = percentage(spent, budget.amount);
    BudgetStatus {
        budget: budget.clone(),
        spent_amount: spent,
        remaining: budget.amount - spent,
        percentage: pct,
        state: alert_state(pct, budget.alert_threshold),
    }
}

fn validate(repo: &impl RecordRepository, b: &NewBudget) -> Result<()> {
    if b.amount <= Decimal::ZERO {
        return Err(LedgerError::validation("budget amount must be greater than 0"));
    }
    if !(1..=12).contains(&b.month) {
        return Err(LedgerError::validation(format!("invalid month {}", b.month)));
    }
    if !(1..=100).contains(&b.alert_threshold) {
        return Err(LedgerError::validation(
            "alert threshold must be between 1 and 100",
        ));
    }
    let category = repo.get_category(b.category_id)?;
    if category.user_id != b.user_id {
        return Err(LedgerError::not_found("category", b.category_id));
    }
    if category.kind != TransactionType::Expense {
        return Err(LedgerError::validation(format!(
            "category '{}' is not an expense category",
            category.name
        )));
    }
    Ok(())
}

/// Inserts a new budget; a second one for the same category and month is
/// rejected and the first is left as it was.
pub fn create_budget<R: RecordRepository>(repo: &R, b: &NewBudget) -> Result<Budget> {
    validate(repo, b)?;
    if repo
        .get_budget(&b.user_id, b.category_id, b.month, b.year)?
        .is_some()
    {
        return Err(LedgerError::DuplicateBudget {
            category_id: b.category_id,
            month: b.month,
            year: b.year,
        });
    }
    let created = repo.insert_budget(b)?;
    info!(budget_id = created.id, "budget created");
    Ok(created)
}

pub fn upsert_budget<R: RecordRepository>(repo: &R, b: &NewBudget) -> Result<Budget> {
    validate(repo, b)?;
    repo.upsert_budget(b)
}
