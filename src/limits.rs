// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Card limit reconciliation.
//!
//! The available limit is never stored. It is derived on every read from the
//! card's transactions inside a [`BillingWindow`] the caller picks: the whole
//! history, the calendar month, or the billing cycle that ends on the card's
//! closing day.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::error::{LedgerError, Result};
use crate::models::{
    CreditCard, NewTransaction, PaymentMethod, RecurrenceType, Transaction, TransactionType,
};
use crate::repository::{RecordRepository, TransactionFilter};
use crate::utils::{clamped_day, first_day_of_month, last_day_of_month};

/// Window shape without a reference date, as stored in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    AllTime,
    CalendarMonth,
    ClosingCycle,
}

impl WindowKind {
    pub fn at(self, reference: NaiveDate) -> BillingWindow {
        match self {
            WindowKind::AllTime => BillingWindow::AllTime,
            WindowKind::CalendarMonth => BillingWindow::CalendarMonth(reference),
            WindowKind::ClosingCycle => BillingWindow::ClosingCycle(reference),
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowKind::AllTime => "all",
            WindowKind::CalendarMonth => "month",
            WindowKind::ClosingCycle => "cycle",
        })
    }
}

impl FromStr for WindowKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all-time" => Ok(WindowKind::AllTime),
            "month" | "calendar-month" => Ok(WindowKind::CalendarMonth),
            "cycle" | "closing-cycle" => Ok(WindowKind::ClosingCycle),
            other => Err(LedgerError::validation(format!(
                "invalid limit window '{}', expected all|month|cycle",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingWindow {
    AllTime,
    /// Calendar month containing the date.
    CalendarMonth(NaiveDate),
    /// Billing cycle containing the date, closed on the card's closing day.
    ClosingCycle(NaiveDate),
}

impl BillingWindow {
    /// Inclusive date bounds for `card`, `None` for the whole history.
    pub fn bounds(&self, card: &CreditCard) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            BillingWindow::AllTime => None,
            BillingWindow::CalendarMonth(d) => Some((first_day_of_month(d), last_day_of_month(d))),
            BillingWindow::ClosingCycle(d) => closing_cycle(d, card.closing_day),
        }
    }
}

/// The cycle `(previous closing, this closing]` that contains `reference`.
/// Closing days past the end of a short month fall on its last day.
pub fn closing_cycle(reference: NaiveDate, closing_day: u32) -> Option<(NaiveDate, NaiveDate)> {
    let mut close = clamped_day(reference.year(), reference.month(), closing_day)?;
    if reference > close {
        let next = first_day_of_month(reference).checked_add_months(Months::new(1))?;
        close = clamped_day(next.year(), next.month(), closing_day)?;
    }
    let prev_month = first_day_of_month(close).checked_sub_months(Months::new(1))?;
    let prev_close = clamped_day(prev_month.year(), prev_month.month(), closing_day)?;
    Some((prev_close.succ_opt()?, close))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitStatus {
    pub card_id: i64,
    pub card_name: String,
    pub limit: Decimal,
    pub used: Decimal,
    pub available: Decimal,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
}

/// Spend minus credits (payments, refunds, voucher resets), kept within
/// `[0, limit]`.
pub fn used_limit(card: &CreditCard, transactions: &[Transaction]) -> Decimal {
    let mut spent = Decimal::ZERO;
    let mut credited = Decimal::ZERO;
    for t in transactions.iter().filter(|t| t.credit_card_id == Some(card.id)) {
        match t.kind {
            TransactionType::Expense => spent += t.amount.abs(),
            TransactionType::Income => credited += t.amount.abs(),
        }
    }
    (spent - credited).clamp(Decimal::ZERO, card.limit.max(Decimal::ZERO))
}

pub fn limit_status(
    card: &CreditCard,
    transactions: &[Transaction],
    window: BillingWindow,
) -> LimitStatus {
    let bounds = window.bounds(card);
    let in_window: Vec<Transaction> = transactions
        .iter()
        .filter(|t| bounds.is_none_or(|(s, e)| t.date >= s && t.date <= e))
        .cloned()
        .collect();
    let limit = card.limit.max(Decimal::ZERO);
    let used = used_limit(card, &in_window);
    LimitStatus {
        card_id: card.id,
        card_name: card.name.clone(),
        limit,
        used,
        available: limit - used,
        window_start: bounds.map(|b| b.0),
        window_end: bounds.map(|b| b.1),
    }
}

#[instrument(skip(repo))]
pub fn card_limit_status<R: RecordRepository>(
    repo: &R,
    card_id: i64,
    window: BillingWindow,
) -> Result<LimitStatus> {
    let card = repo.get_card(card_id)?;
    let mut filter = TransactionFilter {
        credit_card_id: Some(card.id),
        ..TransactionFilter::for_user(&card.user_id)
    };
    if let Some((from, to)) = window.bounds(&card) {
        filter = filter.between(from, to);
    }
    let txs = repo.find_transactions(&filter)?;
    let status = limit_status(&card, &txs, window);
    debug!(used = %status.used, available = %status.available, "card limit computed");
    Ok(status)
}

pub fn compute_available_limit<R: RecordRepository>(
    repo: &R,
    card_id: i64,
    window: BillingWindow,
) -> Result<Decimal> {
    Ok(card_limit_status(repo, card_id, window)?.available)
}

/// Builds the ledger entry that moves the card's available limit to
/// `target`; `None` when it is already there.
pub fn plan_limit_adjustment<R: RecordRepository>(
    repo: &R,
    card_id: i64,
    target: Decimal,
    today: NaiveDate,
) -> Result<Option<NewTransaction>> {
    let card = repo.get_card(card_id)?;
    if target < Decimal::ZERO || target > card.limit {
        return Err(LedgerError::validation(format!(
            "available limit must be between 0 and {}",
            card.limit
        )));
    }
    let current = card_limit_status(repo, card_id, BillingWindow::AllTime)?;
    let diff = target - current.available;
    if diff.is_zero() {
        return Ok(None);
    }
    let kind = if diff > Decimal::ZERO {
        TransactionType::Income
    } else {
        TransactionType::Expense
    };
    let category = repo
        .get_categories_by_type(&card.user_id, kind)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            LedgerError::validation(format!("no {} category to book the adjustment", kind))
        })?;
    let mut entry = NewTransaction::simple(
        &card.user_id,
        &format!("Ajuste de limite - {}", card.name),
        diff.abs(),
        today,
        kind,
        category.id,
    );
    entry.payment_method = if card.is_food_voucher() {
        PaymentMethod::FoodVoucher
    } else {
        PaymentMethod::Credit
    };
    entry.recurrence_type = RecurrenceType::Single;
    entry.credit_card_id = Some(card.id);
    Ok(Some(entry))
}
