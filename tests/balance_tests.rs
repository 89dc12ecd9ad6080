// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use cofre::balance::{account_balance, balance_from, drifted_accounts, recompute_bank_account_balance};
use cofre::classifier::VoucherHeuristic;
use cofre::db;
use cofre::ledger::{Ledger, create_transaction};
use cofre::limits::WindowKind;
use cofre::models::{CardType, NewTransaction, PaymentMethod, TransactionType};
use cofre::repository::{RecordRepository, SqliteRepository};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

struct Fixture {
    conn: Connection,
    account: i64,
    card: i64,
    groceries: i64,
    salary: i64,
}

fn setup() -> Fixture {
    let conn = db::open_in_memory().unwrap();
    let (account, card, groceries, salary) = {
        let repo = SqliteRepository::new(&conn);
        let a = repo.insert_account("alice", "Conta", d("5000")).unwrap();
        let c = repo
            .insert_card("alice", "Visa", d("2000"), 10, 3, CardType::Credit)
            .unwrap();
        let g = repo
            .insert_category("alice", "Mercado", TransactionType::Expense, None, None)
            .unwrap();
        let s = repo
            .insert_category("alice", "Salário", TransactionType::Income, None, None)
            .unwrap();
        (a.id, c.id, g.id, s.id)
    };
    Fixture {
        conn,
        account,
        card,
        groceries,
        salary,
    }
}

fn ledger() -> Ledger {
    Ledger::new(VoucherHeuristic::default(), WindowKind::AllTime, day("2025-03-31"))
}

fn debit(f: &Fixture, description: &str, amount: &str, kind: TransactionType) -> NewTransaction {
    let category = match kind {
        TransactionType::Expense => f.groceries,
        TransactionType::Income => f.salary,
    };
    let mut t = NewTransaction::simple("alice", description, d(amount), day("2025-03-02"), kind, category);
    t.payment_method = PaymentMethod::Debit;
    t.bank_account_id = Some(f.account);
    t
}

#[test]
fn expense_reduces_balance() {
    let mut f = setup();
    let l = ledger();
    let input = debit(&f, "Mercado", "120", TransactionType::Expense);
    let out = create_transaction(&mut f.conn, &l, &input).unwrap();
    assert_eq!(out.transactions[0].amount, d("-120"));
    assert_eq!(out.reconciled.accounts.len(), 1);
    assert_eq!(out.reconciled.accounts[0].balance, d("4880"));

    let repo = SqliteRepository::new(&f.conn);
    assert_eq!(repo.get_account(f.account).unwrap().current_balance, d("4880"));
}

#[test]
fn balance_is_initial_plus_signed_sum() {
    let mut f = setup();
    let l = ledger();
    for (desc, amount, kind) in [
        ("Salário", "3000", TransactionType::Income),
        ("Mercado", "250.40", TransactionType::Expense),
        ("Farmácia", "-49.60", TransactionType::Expense),
    ] {
        let input = debit(&f, desc, amount, kind);
        create_transaction(&mut f.conn, &l, &input).unwrap();
    }
    let repo = SqliteRepository::new(&f.conn);
    let account = repo.get_account(f.account).unwrap();
    assert_eq!(account.current_balance, d("7700"));
    assert_eq!(account_balance(&repo, f.account).unwrap(), d("7700"));
}

#[test]
fn card_spend_leaves_bank_untouched() {
    let mut f = setup();
    let l = ledger();
    let mut input = NewTransaction::simple(
        "alice",
        "Livraria",
        d("300"),
        day("2025-03-05"),
        TransactionType::Expense,
        f.groceries,
    );
    input.payment_method = PaymentMethod::Credit;
    input.credit_card_id = Some(f.card);
    let out = create_transaction(&mut f.conn, &l, &input).unwrap();
    assert!(out.reconciled.accounts.is_empty());
    assert_eq!(out.reconciled.cards[0].available, d("1700"));

    let repo = SqliteRepository::new(&f.conn);
    assert_eq!(repo.get_account(f.account).unwrap().current_balance, d("5000"));
}

#[test]
fn drift_is_found_and_repaired() {
    let f = setup();
    let repo = SqliteRepository::new(&f.conn);
    // Written behind the ledger's back, so the cached balance goes stale.
    let raw = debit(&f, "Mercado", "-80", TransactionType::Expense);
    repo.create_transaction(&raw).unwrap();

    let accounts = repo.list_accounts("alice").unwrap();
    let drifted = drifted_accounts(&repo, &accounts).unwrap();
    assert_eq!(drifted.len(), 1);
    assert_eq!(drifted[0].1, d("4920"));

    assert_eq!(recompute_bank_account_balance(&repo, f.account).unwrap(), d("4920"));
    let accounts = repo.list_accounts("alice").unwrap();
    assert!(drifted_accounts(&repo, &accounts).unwrap().is_empty());
}

#[test]
fn balance_from_ignores_other_accounts() {
    let f = setup();
    let repo = SqliteRepository::new(&f.conn);
    let other = repo.insert_account("alice", "Poupança", d("100")).unwrap();
    let mut raw = debit(&f, "Transferência", "500", TransactionType::Income);
    raw.bank_account_id = Some(other.id);
    let t = repo.create_transaction(&raw).unwrap();

    let main = repo.get_account(f.account).unwrap();
    assert_eq!(balance_from(&main, std::slice::from_ref(&t)), d("5000"));
    assert_eq!(balance_from(&other, &[t]), d("600"));
}

#[test]
fn missing_account_is_not_found() {
    let f = setup();
    let repo = SqliteRepository::new(&f.conn);
    let err = recompute_bank_account_balance(&repo, 999).unwrap_err();
    assert!(err.is_not_found());
}
