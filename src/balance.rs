// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::{BankAccount, Transaction};
use crate::repository::{RecordRepository, TransactionFilter};

/// initial balance plus every signed amount that references the account.
pub fn balance_from(account: &BankAccount, transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.bank_account_id == Some(account.id))
        .fold(account.initial_balance, |acc, t| acc + t.amount)
}

/// Current balance straight from the transaction set; the cached column is
/// never consulted.
pub fn account_balance<R: RecordRepository>(repo: &R, account_id: i64) -> Result<Decimal> {
    let account = repo.get_account(account_id)?;
    let filter = TransactionFilter {
        bank_account_id: Some(account.id),
        ..TransactionFilter::for_user(&account.user_id)
    };
    let txs = repo.find_transactions(&filter)?;
    Ok(balance_from(&account, &txs))
}

/// Recomputes the balance from full history and overwrites the cached value.
#[instrument(skip(repo))]
pub fn recompute_bank_account_balance<R: RecordRepository>(
    repo: &R,
    account_id: i64,
) -> Result<Decimal> {
    let balance = account_balance(repo, account_id)?;
    repo.update_account_balance(account_id, balance)?;
    debug!(%balance, "bank account balance recomputed");
    Ok(balance)
}

/// Accounts whose cached balance disagrees with the recomputed one.
pub fn drifted_accounts<R: RecordRepository>(
    repo: &R,
    accounts: &[BankAccount],
) -> Result<Vec<(BankAccount, Decimal)>> {
    let mut out = Vec::new();
    for a in accounts {
        let actual = account_balance(repo, a.id)?;
        if actual != a.current_balance {
            out.push((a.clone(), actual));
        }
    }
    Ok(out)
}
