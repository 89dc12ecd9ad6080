// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Monthly food voucher reset.
//!
//! A reset books one INCOME row on the voucher card equal to the month's
//! voucher spend, bringing the card back to its full limit. The marker row
//! itself records that the month was reset, so the guard survives restarts
//! and works across processes. Re-running a reset replaces the marker
//! instead of adding a second one.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

use crate::error::{LedgerError, Result};
use crate::models::{
    CreditCard, NewTransaction, PaymentMethod, RecurrenceType, Transaction, TransactionType,
};
use crate::repository::{RecordRepository, TransactionFilter};
use crate::utils::{first_day_of_month, last_day_of_month};

pub const RESET_PREFIX: &str = "[VALE ALIMENTAÇÃO] Reset";
const RESET_MARKER: &str = "Reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResetTrigger {
    Scheduled,
    FirstDay,
    Manual,
    Forced,
}

impl ResetTrigger {
    /// Manual and forced runs skip the once-a-month guard.
    pub fn bypasses_guard(&self) -> bool {
        matches!(self, ResetTrigger::Manual | ResetTrigger::Forced)
    }

    fn label(&self) -> &'static str {
        if self.bypasses_guard() {
            "Manual"
        } else {
            "Automático"
        }
    }
}

/// Flags accepted by the reset entry point.
#[derive(Debug, Clone, Default)]
pub struct ResetRequest {
    pub scheduler_token: Option<String>,
    pub force: bool,
    pub first_day: bool,
    pub manual: bool,
    /// `None` resets every user's cards (scheduled runs only).
    pub user_id: Option<String>,
}

impl ResetRequest {
    pub fn trigger(&self) -> ResetTrigger {
        if self.force {
            ResetTrigger::Forced
        } else if self.manual {
            ResetTrigger::Manual
        } else if self.first_day {
            ResetTrigger::FirstDay
        } else {
            ResetTrigger::Scheduled
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResetOutcome {
    pub card_id: i64,
    pub card_name: String,
    pub user_id: String,
    pub reset_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResetFailure {
    pub card_id: i64,
    pub card_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub success: bool,
    pub message: String,
    pub was_skipped: bool,
    pub trigger: ResetTrigger,
    pub resets: Vec<CardResetOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CardResetFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_users: Vec<String>,
}

impl ResetReport {
    fn skipped(trigger: ResetTrigger, message: impl Into<String>) -> Self {
        ResetReport {
            success: true,
            message: message.into(),
            was_skipped: true,
            trigger,
            resets: Vec::new(),
            failures: Vec::new(),
            skipped_users: Vec::new(),
        }
    }
}

fn in_month(date: NaiveDate, month: NaiveDate) -> bool {
    date.year() == month.year() && date.month() == month.month()
}

pub fn is_reset_marker(t: &Transaction, card_id: i64, month: NaiveDate) -> bool {
    t.kind == TransactionType::Income
        && t.credit_card_id == Some(card_id)
        && t.description.contains(RESET_MARKER)
        && in_month(t.date, month)
}

fn card_month_transactions<R: RecordRepository>(
    repo: &R,
    card: &CreditCard,
    today: NaiveDate,
) -> Result<Vec<Transaction>> {
    let filter = TransactionFilter {
        credit_card_id: Some(card.id),
        ..TransactionFilter::for_user(&card.user_id)
    }
    .between(first_day_of_month(today), last_day_of_month(today));
    repo.find_transactions(&filter)
}

/// Whether any of the user's voucher cards already carries a reset marker
/// for the month containing `today`.
pub fn already_reset<R: RecordRepository>(
    repo: &R,
    cards: &[CreditCard],
    today: NaiveDate,
) -> Result<bool> {
    for card in cards {
        let txs = card_month_transactions(repo, card, today)?;
        if txs.iter().any(|t| is_reset_marker(t, card.id, today)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Replaces this month's reset marker on one card. Everything that can fail
/// on bad data is looked up before the first write.
#[instrument(skip(repo, card), fields(card_id = card.id))]
pub fn reset_card<R: RecordRepository>(
    repo: &R,
    card: &CreditCard,
    trigger: ResetTrigger,
    today: NaiveDate,
) -> Result<CardResetOutcome> {
    if !card.is_food_voucher() {
        return Err(LedgerError::validation(format!(
            "card '{}' is not a food voucher card",
            card.name
        )));
    }
    let txs = card_month_transactions(repo, card, today)?;
    let markers: Vec<i64> = txs
        .iter()
        .filter(|t| is_reset_marker(t, card.id, today))
        .map(|t| t.id)
        .collect();
    let spent: Decimal = txs
        .iter()
        .filter(|t| t.kind == TransactionType::Expense)
        .map(|t| t.amount.abs())
        .sum();

    let category = if spent > Decimal::ZERO {
        // First income category of the owner; there is no dedicated one.
        let c = repo
            .get_categories_by_type(&card.user_id, TransactionType::Income)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LedgerError::validation(format!(
                    "user {} has no income category for the reset",
                    card.user_id
                ))
            })?;
        Some(c)
    } else {
        None
    };

    for id in &markers {
        repo.delete_transaction(*id)?;
    }

    let Some(category) = category else {
        info!(replaced = markers.len(), "no voucher spend this month");
        return Ok(CardResetOutcome {
            card_id: card.id,
            card_name: card.name.clone(),
            user_id: card.user_id.clone(),
            reset_amount: Decimal::ZERO,
            transaction_id: None,
            message: Some("no voucher spending this month".to_string()),
        });
    };

    let mut entry = NewTransaction::simple(
        &card.user_id,
        &format!("{} {} - {}", RESET_PREFIX, trigger.label(), card.name),
        spent,
        today,
        TransactionType::Income,
        category.id,
    );
    entry.payment_method = PaymentMethod::FoodVoucher;
    entry.recurrence_type = RecurrenceType::Single;
    entry.credit_card_id = Some(card.id);
    entry.voucher_credit = true;
    let created = repo.create_transaction(&entry)?;
    info!(amount = %spent, transaction_id = created.id, replaced = markers.len(), "voucher card reset");

    Ok(CardResetOutcome {
        card_id: card.id,
        card_name: card.name.clone(),
        user_id: card.user_id.clone(),
        reset_amount: spent,
        transaction_id: Some(created.id),
        message: None,
    })
}

fn authorize(request: &ResetRequest, configured_token: Option<&str>) -> Result<()> {
    if let Some(given) = request.scheduler_token.as_deref() {
        return match configured_token {
            Some(expected) if expected == given => Ok(()),
            _ => Err(LedgerError::Unauthorized),
        };
    }
    match request.trigger() {
        ResetTrigger::Scheduled | ResetTrigger::FirstDay => Err(LedgerError::Unauthorized),
        ResetTrigger::Manual | ResetTrigger::Forced => {
            if request.user_id.is_none() {
                Err(LedgerError::validation("manual resets need a user"))
            } else {
                Ok(())
            }
        }
    }
}

/// Runs the reset for every food voucher card in scope.
///
/// Failures on one card are logged and listed under `failures`; the
/// remaining cards are still processed.
#[instrument(skip(repo, request, configured_token), fields(trigger = ?request.trigger()))]
pub fn run_reset<R: RecordRepository>(
    repo: &R,
    request: &ResetRequest,
    configured_token: Option<&str>,
    today: NaiveDate,
) -> Result<ResetReport> {
    authorize(request, configured_token)?;
    let trigger = request.trigger();

    if trigger == ResetTrigger::FirstDay && today.day() != 1 {
        return Ok(ResetReport::skipped(
            trigger,
            format!("{} is not the first day of the month", today),
        ));
    }

    let cards = repo.list_food_voucher_cards(request.user_id.as_deref())?;
    if cards.is_empty() {
        return Ok(ResetReport::skipped(trigger, "no food voucher cards"));
    }
    let mut by_user: BTreeMap<String, Vec<CreditCard>> = BTreeMap::new();
    for c in cards {
        by_user.entry(c.user_id.clone()).or_default().push(c);
    }

    let mut resets = Vec::new();
    let mut failures = Vec::new();
    let mut skipped_users = Vec::new();
    for (user, cards) in &by_user {
        if !trigger.bypasses_guard() && already_reset(repo, cards, today)? {
            warn!(user = %user, "voucher reset already ran this month, skipping");
            skipped_users.push(user.clone());
            continue;
        }
        for card in cards {
            match reset_card(repo, card, trigger, today) {
                Ok(outcome) => resets.push(outcome),
                Err(err) => {
                    error!(card_id = card.id, %err, "voucher reset failed");
                    failures.push(CardResetFailure {
                        card_id: card.id,
                        card_name: card.name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    if skipped_users.len() == by_user.len() {
        let mut report = ResetReport::skipped(trigger, "voucher reset already ran this month");
        report.skipped_users = skipped_users;
        return Ok(report);
    }

    let booked = resets.iter().filter(|r| r.transaction_id.is_some()).count();
    let mut message = format!("{} card(s) processed, {} reset booked", resets.len(), booked);
    if !failures.is_empty() {
        message.push_str(&format!(", {} failed", failures.len()));
    }
    Ok(ResetReport {
        success: true,
        message,
        was_skipped: false,
        trigger,
        resets,
        failures,
        skipped_users,
    })
}
