// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction mutations and the reconciliation that follows them.
//!
//! Every create, update and delete re-runs the balance of each bank account
//! and the limit of each card it touched, old and new, even when the amount
//! looks unchanged. [`in_write_tx`] runs the write and the recomputation in
//! one `IMMEDIATE` SQLite transaction: concurrent writers queue on the write
//! lock instead of overwriting each other's balance, and a failed
//! recomputation rolls the write back.

use chrono::{Months, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

use crate::balance::recompute_bank_account_balance;
use crate::classifier::{Channel, VoucherHeuristic, classify_parts, normalize_amount};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::limits::{LimitStatus, WindowKind, card_limit_status, plan_limit_adjustment};
use crate::models::{
    NewTransaction, PaymentMethod, RecurrenceType, Transaction, TransactionPatch, TransactionType,
};
use crate::repository::{RecordRepository, SqliteRepository};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: i64,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciled {
    pub accounts: Vec<AccountBalance>,
    pub cards: Vec<LimitStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub transactions: Vec<Transaction>,
    pub reconciled: Reconciled,
}

/// Accounts and cards a mutation has to reconcile.
#[derive(Debug, Default)]
struct Touched {
    accounts: BTreeSet<i64>,
    cards: BTreeSet<i64>,
}

impl Touched {
    fn add(&mut self, bank_account_id: Option<i64>, credit_card_id: Option<i64>) {
        self.accounts.extend(bank_account_id);
        self.cards.extend(credit_card_id);
    }
}

/// Runs `f` against a repository inside an `IMMEDIATE` transaction, committing
/// only when it succeeds.
pub fn in_write_tx<T>(
    conn: &mut Connection,
    f: impl FnOnce(&SqliteRepository<'_>) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let out = {
        let repo = SqliteRepository::new(&tx);
        f(&repo)?
    };
    tx.commit()?;
    Ok(out)
}

pub struct Ledger {
    heuristic: VoucherHeuristic,
    limit_window: WindowKind,
    today: NaiveDate,
}

impl Ledger {
    pub fn new(heuristic: VoucherHeuristic, limit_window: WindowKind, today: NaiveDate) -> Self {
        Ledger {
            heuristic,
            limit_window,
            today,
        }
    }

    pub fn from_config(cfg: &LedgerConfig, today: NaiveDate) -> Result<Self> {
        Ok(Ledger::new(
            VoucherHeuristic::new(&cfg.voucher_credit_pattern)?,
            cfg.limit_window,
            today,
        ))
    }

    /// Validates a draft and rewrites it into canonical form: signed
    /// amount, payment method consistent with the linked card, voucher flag.
    fn prepare<R: RecordRepository>(&self, repo: &R, draft: &mut NewTransaction) -> Result<()> {
        draft.description = draft.description.trim().to_string();
        if draft.description.is_empty() {
            return Err(LedgerError::validation("description is required"));
        }
        if draft.amount.is_zero() {
            return Err(LedgerError::validation("amount is required"));
        }
        draft.amount = normalize_amount(draft.kind, draft.amount);

        let category = repo.get_category(draft.category_id)?;
        if category.user_id != draft.user_id {
            return Err(LedgerError::not_found("category", draft.category_id));
        }

        match draft.recurrence_type {
            RecurrenceType::Installment => match draft.installments {
                Some(n) if n >= 2 => {
                    if draft.current_installment.is_some_and(|c| c == 0 || c > n) {
                        return Err(LedgerError::validation(format!(
                            "current installment must be between 1 and {}",
                            n
                        )));
                    }
                }
                _ => {
                    return Err(LedgerError::validation(
                        "installment transactions need at least 2 installments",
                    ));
                }
            },
            RecurrenceType::Single | RecurrenceType::Recurring => {
                draft.installments = None;
                draft.current_installment = None;
            }
        }

        let cards = repo.list_cards(&draft.user_id)?;
        if let Some(card_id) = draft.credit_card_id {
            let card = cards
                .iter()
                .find(|c| c.id == card_id)
                .ok_or_else(|| LedgerError::not_found("card", card_id))?;
            if card.is_food_voucher() {
                draft.payment_method = PaymentMethod::FoodVoucher;
            } else if !draft.payment_method.uses_card() {
                return Err(LedgerError::validation(format!(
                    "{} payments cannot be linked to card '{}'",
                    draft.payment_method, card.name
                )));
            }
        } else if draft.payment_method.uses_card() {
            return Err(LedgerError::validation(format!(
                "{} payments need a card",
                draft.payment_method
            )));
        }

        if let Some(account_id) = draft.bank_account_id {
            if draft.payment_method.uses_card() {
                return Err(LedgerError::validation(format!(
                    "{} payments cannot move a bank account",
                    draft.payment_method
                )));
            }
            let account = repo.get_account(account_id)?;
            if account.user_id != draft.user_id {
                return Err(LedgerError::not_found("account", account_id));
            }
        }

        let channel = classify_parts(draft.payment_method, draft.credit_card_id, &cards);
        draft.voucher_credit = draft.kind == TransactionType::Income
            && channel != Channel::Credit
            && (draft.voucher_credit || self.heuristic.matches(&draft.description));
        Ok(())
    }

    fn reconcile<R: RecordRepository>(&self, repo: &R, touched: &Touched) -> Result<Reconciled> {
        let mut out = Reconciled::default();
        for &id in &touched.accounts {
            let balance = recompute_bank_account_balance(repo, id).map_err(|e| {
                LedgerError::Reconciliation {
                    target: format!("account {}", id),
                    reason: e.to_string(),
                }
            })?;
            out.accounts.push(AccountBalance {
                account_id: id,
                balance,
            });
        }
        let window = self.limit_window.at(self.today);
        for &id in &touched.cards {
            let status =
                card_limit_status(repo, id, window).map_err(|e| LedgerError::Reconciliation {
                    target: format!("card {}", id),
                    reason: e.to_string(),
                })?;
            out.cards.push(status);
        }
        Ok(out)
    }

    /// Records a transaction. INSTALLMENT input with `installments = n`
    /// becomes n independent monthly rows carrying the same description.
    #[instrument(skip(self, repo, input), fields(user = %input.user_id))]
    pub fn create<R: RecordRepository>(
        &self,
        repo: &R,
        input: &NewTransaction,
    ) -> Result<MutationOutcome> {
        let mut draft = input.clone();
        self.prepare(repo, &mut draft)?;

        let mut created = Vec::new();
        match (draft.recurrence_type, draft.installments) {
            (RecurrenceType::Installment, Some(n)) if draft.current_installment.is_none() => {
                for i in 0..n {
                    let mut row = draft.clone();
                    row.current_installment = Some(i + 1);
                    row.date = draft
                        .date
                        .checked_add_months(Months::new(i))
                        .ok_or_else(|| LedgerError::validation("installment date out of range"))?;
                    created.push(repo.create_transaction(&row)?);
                }
            }
            _ => created.push(repo.create_transaction(&draft)?),
        }

        let mut touched = Touched::default();
        touched.add(draft.bank_account_id, draft.credit_card_id);
        let reconciled = self.reconcile(repo, &touched)?;
        info!(rows = created.len(), "transaction recorded");
        Ok(MutationOutcome {
            transactions: created,
            reconciled,
        })
    }

    #[instrument(skip(self, repo, patch))]
    pub fn update<R: RecordRepository>(
        &self,
        repo: &R,
        user_id: &str,
        id: i64,
        patch: &TransactionPatch,
    ) -> Result<MutationOutcome> {
        let existing = owned_transaction(repo, user_id, id)?;
        let merged = existing.with_patch(patch);
        let mut draft = draft_from(&merged);
        self.prepare(repo, &mut draft)?;

        let full = TransactionPatch {
            description: Some(draft.description.clone()),
            amount: Some(draft.amount),
            date: Some(draft.date),
            kind: Some(draft.kind),
            payment_method: Some(draft.payment_method),
            recurrence_type: Some(draft.recurrence_type),
            installments: Some(draft.installments),
            current_installment: Some(draft.current_installment),
            category_id: Some(draft.category_id),
            bank_account_id: Some(draft.bank_account_id),
            credit_card_id: Some(draft.credit_card_id),
            voucher_credit: Some(draft.voucher_credit),
        };
        let updated = repo.update_transaction(id, &full)?;

        let mut touched = Touched::default();
        touched.add(existing.bank_account_id, existing.credit_card_id);
        touched.add(updated.bank_account_id, updated.credit_card_id);
        let reconciled = self.reconcile(repo, &touched)?;
        info!("transaction updated");
        Ok(MutationOutcome {
            transactions: vec![updated],
            reconciled,
        })
    }

    /// Deletes one row. Sibling installments or recurring occurrences stay.
    #[instrument(skip(self, repo))]
    pub fn delete<R: RecordRepository>(
        &self,
        repo: &R,
        user_id: &str,
        id: i64,
    ) -> Result<MutationOutcome> {
        let existing = owned_transaction(repo, user_id, id)?;
        repo.delete_transaction(id)?;
        let mut touched = Touched::default();
        touched.add(existing.bank_account_id, existing.credit_card_id);
        let reconciled = self.reconcile(repo, &touched)?;
        info!("transaction deleted");
        Ok(MutationOutcome {
            transactions: vec![existing],
            reconciled,
        })
    }

    /// Books the entry that brings a card's all-time available limit to
    /// `target`, in place of overwriting a derived value.
    pub fn adjust_available_limit<R: RecordRepository>(
        &self,
        repo: &R,
        user_id: &str,
        card_id: i64,
        target: Decimal,
    ) -> Result<Option<MutationOutcome>> {
        let card = repo.get_card(card_id)?;
        if card.user_id != user_id {
            return Err(LedgerError::not_found("card", card_id));
        }
        match plan_limit_adjustment(repo, card_id, target, self.today)? {
            Some(entry) => Ok(Some(self.create(repo, &entry)?)),
            None => {
                warn!(card_id, "available limit already at target, nothing booked");
                Ok(None)
            }
        }
    }
}

fn owned_transaction<R: RecordRepository>(repo: &R, user_id: &str, id: i64) -> Result<Transaction> {
    let t = repo.get_transaction(id)?;
    if t.user_id != user_id {
        return Err(LedgerError::not_found("transaction", id));
    }
    Ok(t)
}

fn draft_from(t: &Transaction) -> NewTransaction {
    NewTransaction {
        user_id: t.user_id.clone(),
        description: t.description.clone(),
        amount: t.amount,
        date: t.date,
        kind: t.kind,
        payment_method: t.payment_method,
        recurrence_type: t.recurrence_type,
        installments: t.installments,
        current_installment: t.current_installment,
        category_id: t.category_id,
        bank_account_id: t.bank_account_id,
        credit_card_id: t.credit_card_id,
        voucher_credit: t.voucher_credit,
    }
}

pub fn create_transaction(
    conn: &mut Connection,
    ledger: &Ledger,
    input: &NewTransaction,
) -> Result<MutationOutcome> {
    in_write_tx(conn, |repo| ledger.create(repo, input))
}

pub fn update_transaction(
    conn: &mut Connection,
    ledger: &Ledger,
    user_id: &str,
    id: i64,
    patch: &TransactionPatch,
) -> Result<MutationOutcome> {
    in_write_tx(conn, |repo| ledger.update(repo, user_id, id, patch))
}

pub fn delete_transaction(
    conn: &mut Connection,
    ledger: &Ledger,
    user_id: &str,
    id: i64,
) -> Result<MutationOutcome> {
    in_write_tx(conn, |repo| ledger.delete(repo, user_id, id))
}
