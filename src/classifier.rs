// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Decides which pot of money a transaction moves: a bank account, a credit
//! card limit, or a food voucher balance.

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::error::{LedgerError, Result};
use crate::models::{CreditCard, PaymentMethod, Transaction, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Bank,
    Credit,
    FoodVoucher,
}

/// Classifies by payment method and the linked card. A food voucher card
/// wins over whatever payment method the row claims.
pub fn classify(tx: &Transaction, cards: &[CreditCard]) -> Channel {
    classify_parts(tx.payment_method, tx.credit_card_id, cards)
}

pub fn classify_parts(
    payment_method: PaymentMethod,
    credit_card_id: Option<i64>,
    cards: &[CreditCard],
) -> Channel {
    if payment_method == PaymentMethod::FoodVoucher {
        return Channel::FoodVoucher;
    }
    let linked = credit_card_id.and_then(|id| cards.iter().find(|c| c.id == id));
    if linked.is_some_and(|c| c.is_food_voucher()) {
        return Channel::FoodVoucher;
    }
    if payment_method == PaymentMethod::Credit {
        return Channel::Credit;
    }
    Channel::Bank
}

/// Canonical sign: expenses negative, income positive, whatever the caller sent.
pub fn normalize_amount(kind: TransactionType, amount: Decimal) -> Decimal {
    match kind {
        TransactionType::Income => amount.abs(),
        TransactionType::Expense => -amount.abs(),
    }
}

/// Description matcher for voucher credits that arrive without a card link.
///
/// Text matching is locale dependent and easy to fool; the structural
/// `voucher_credit` flag takes precedence and the pattern only covers rows
/// recorded before it existed.
#[derive(Debug, Clone)]
pub struct VoucherHeuristic {
    pattern: Option<Regex>,
}

impl VoucherHeuristic {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Ok(Self::disabled());
        }
        let re = Regex::new(pattern).map_err(|err| {
            LedgerError::validation(format!("invalid voucher pattern '{}': {}", pattern, err))
        })?;
        Ok(VoucherHeuristic { pattern: Some(re) })
    }

    pub fn disabled() -> Self {
        VoucherHeuristic { pattern: None }
    }

    pub fn matches(&self, description: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|re| re.is_match(description))
    }
}

impl Default for VoucherHeuristic {
    fn default() -> Self {
        VoucherHeuristic::new(crate::config::DEFAULT_VOUCHER_PATTERN).unwrap_or_else(|err| {
            warn!(%err, "default voucher pattern rejected, heuristic disabled");
            VoucherHeuristic::disabled()
        })
    }
}

/// Wraps the owner's cards and the heuristic for repeated lookups.
#[derive(Debug, Clone)]
pub struct Classifier<'a> {
    cards: &'a [CreditCard],
    heuristic: &'a VoucherHeuristic,
}

impl<'a> Classifier<'a> {
    pub fn new(cards: &'a [CreditCard], heuristic: &'a VoucherHeuristic) -> Self {
        Classifier { cards, heuristic }
    }

    pub fn channel(&self, tx: &Transaction) -> Channel {
        classify(tx, self.cards)
    }

    /// Whether the row moves the food voucher balance rather than income or
    /// expense totals. Card credits never count, matching what the write
    /// path stores in `voucher_credit`.
    pub fn is_voucher(&self, tx: &Transaction) -> bool {
        match self.channel(tx) {
            Channel::FoodVoucher => true,
            Channel::Credit => false,
            Channel::Bank => {
                tx.kind == TransactionType::Income
                    && (tx.voucher_credit || self.heuristic.matches(&tx.description))
            }
        }
    }
}
