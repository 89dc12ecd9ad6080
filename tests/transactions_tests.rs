// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use cofre::classifier::VoucherHeuristic;
use cofre::error::LedgerError;
use cofre::ledger::{Ledger, create_transaction, delete_transaction, in_write_tx, update_transaction};
use cofre::limits::WindowKind;
use cofre::models::{
    CardType, NewTransaction, PaymentMethod, RecurrenceType, TransactionPatch, TransactionType,
};
use cofre::repository::{RecordRepository, SqliteRepository, TransactionFilter};
use cofre::commands::{summary, transactions};
use cofre::{cli, db};
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
    checking: i64,
    savings: i64,
    visa: i64,
    voucher: i64,
    groceries: i64,
}

fn setup() -> Fixture {
    let conn = db::open_in_memory().unwrap();
    let f = {
        let repo = SqliteRepository::new(&conn);
        let checking = repo.insert_account("alice", "Corrente", d("1000")).unwrap().id;
        let savings = repo.insert_account("alice", "Poupança", d("0")).unwrap().id;
        let visa = repo
            .insert_card("alice", "Visa", d("3000"), 10, 3, CardType::Credit)
            .unwrap()
            .id;
        let voucher = repo
            .insert_card("alice", "VA", d("700"), 1, 1, CardType::FoodVoucher)
            .unwrap()
            .id;
        let groceries = repo
            .insert_category("alice", "Mercado", TransactionType::Expense, None, None)
            .unwrap()
            .id;
        (checking, savings, visa, voucher, groceries)
    };
    Fixture {
        conn,
        checking: f.0,
        savings: f.1,
        visa: f.2,
        voucher: f.3,
        groceries: f.4,
    }
}

fn ledger() -> Ledger {
    Ledger::new(VoucherHeuristic::default(), WindowKind::AllTime, day("2025-03-31"))
}

fn on_account(f: &Fixture, amount: &str) -> NewTransaction {
    let mut t = NewTransaction::simple(
        "alice",
        "Mercado",
        d(amount),
        day("2025-03-02"),
        TransactionType::Expense,
        f.groceries,
    );
    t.payment_method = PaymentMethod::Debit;
    t.bank_account_id = Some(f.checking);
    t
}

fn balance(conn: &Connection, id: i64) -> Decimal {
    SqliteRepository::new(conn).get_account(id).unwrap().current_balance
}

#[test]
fn update_reconciles_old_and_new_account() {
    let mut f = setup();
    let l = ledger();
    let input = on_account(&f, "200");
    let created = create_transaction(&mut f.conn, &l, &input).unwrap();
    let id = created.transactions[0].id;
    assert_eq!(balance(&f.conn, f.checking), d("800"));

    let patch = TransactionPatch {
        bank_account_id: Some(Some(f.savings)),
        amount: Some(d("250")),
        ..Default::default()
    };
    let out = update_transaction(&mut f.conn, &l, "alice", id, &patch).unwrap();
    assert_eq!(out.transactions[0].amount, d("-250"));
    assert_eq!(out.reconciled.accounts.len(), 2);
    assert_eq!(balance(&f.conn, f.checking), d("1000"));
    assert_eq!(balance(&f.conn, f.savings), d("-250"));

    delete_transaction(&mut f.conn, &l, "alice", id).unwrap();
    assert_eq!(balance(&f.conn, f.savings), d("0"));
}

#[test]
fn moving_from_account_to_card_reconciles_both() {
    let mut f = setup();
    let l = ledger();
    let input = on_account(&f, "100");
    let id = create_transaction(&mut f.conn, &l, &input).unwrap().transactions[0].id;

    let patch = TransactionPatch {
        payment_method: Some(PaymentMethod::Credit),
        bank_account_id: Some(None),
        credit_card_id: Some(Some(f.visa)),
        ..Default::default()
    };
    let out = update_transaction(&mut f.conn, &l, "alice", id, &patch).unwrap();
    assert_eq!(out.reconciled.accounts[0].balance, d("1000"));
    assert_eq!(out.reconciled.cards[0].available, d("2900"));
}

#[test]
fn installment_purchase_expands_monthly() {
    let mut f = setup();
    let l = ledger();
    let mut t = NewTransaction::simple(
        "alice",
        "Notebook",
        d("400"),
        day("2025-01-31"),
        TransactionType::Expense,
        f.groceries,
    );
    t.payment_method = PaymentMethod::Credit;
    t.credit_card_id = Some(f.visa);
    t.recurrence_type = RecurrenceType::Installment;
    t.installments = Some(3);
    let out = create_transaction(&mut f.conn, &l, &t).unwrap();

    assert_eq!(out.transactions.len(), 3);
    let dates: Vec<NaiveDate> = out.transactions.iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![day("2025-01-31"), day("2025-02-28"), day("2025-03-31")]);
    for (i, row) in out.transactions.iter().enumerate() {
        assert_eq!(row.description, "Notebook");
        assert_eq!(row.amount, d("-400"));
        assert_eq!(row.current_installment, Some(i as u32 + 1));
        assert_eq!(row.installments, Some(3));
    }
    assert_eq!(out.reconciled.cards[0].available, d("1800"));
}

#[test]
fn voucher_card_forces_voucher_method() {
    let mut f = setup();
    let l = ledger();
    let mut t = NewTransaction::simple(
        "alice",
        "Padaria",
        d("30"),
        day("2025-03-05"),
        TransactionType::Expense,
        f.groceries,
    );
    t.payment_method = PaymentMethod::Credit;
    t.credit_card_id = Some(f.voucher);
    let out = create_transaction(&mut f.conn, &l, &t).unwrap();
    assert_eq!(out.transactions[0].payment_method, PaymentMethod::FoodVoucher);
    assert_eq!(out.reconciled.cards[0].available, d("670"));
}

#[test]
fn inconsistent_linkage_is_rejected() {
    let mut f = setup();
    let l = ledger();

    let mut no_card = on_account(&f, "10");
    no_card.payment_method = PaymentMethod::Credit;
    no_card.bank_account_id = None;
    let err = create_transaction(&mut f.conn, &l, &no_card).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let mut debit_on_card = on_account(&f, "10");
    debit_on_card.bank_account_id = None;
    debit_on_card.credit_card_id = Some(f.visa);
    let err = create_transaction(&mut f.conn, &l, &debit_on_card).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let mut both = on_account(&f, "10");
    both.payment_method = PaymentMethod::Credit;
    both.credit_card_id = Some(f.visa);
    let err = create_transaction(&mut f.conn, &l, &both).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let zero = on_account(&f, "0");
    assert!(matches!(
        create_transaction(&mut f.conn, &l, &zero),
        Err(LedgerError::Validation(_))
    ));

    let mut single_installment = on_account(&f, "10");
    single_installment.recurrence_type = RecurrenceType::Installment;
    single_installment.installments = Some(1);
    assert!(matches!(
        create_transaction(&mut f.conn, &l, &single_installment),
        Err(LedgerError::Validation(_))
    ));

    let repo = SqliteRepository::new(&f.conn);
    assert!(repo
        .find_transactions(&TransactionFilter::for_user("alice"))
        .unwrap()
        .is_empty());
}

#[test]
fn other_users_rows_are_not_found() {
    let mut f = setup();
    let l = ledger();
    let input = on_account(&f, "10");
    let id = create_transaction(&mut f.conn, &l, &input).unwrap().transactions[0].id;
    let err = delete_transaction(&mut f.conn, &l, "bob", id).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(balance(&f.conn, f.checking), d("990"));
}

#[test]
fn failed_write_rolls_back() {
    let mut f = setup();
    let input = on_account(&f, "10");
    let res: cofre::error::Result<()> = in_write_tx(&mut f.conn, |repo| {
        repo.create_transaction(&input)?;
        Err(LedgerError::Reconciliation {
            target: "account".into(),
            reason: "boom".into(),
        })
    });
    assert!(res.is_err());
    let repo = SqliteRepository::new(&f.conn);
    assert!(repo
        .find_transactions(&TransactionFilter::for_user("alice"))
        .unwrap()
        .is_empty());
}

#[test]
fn list_limit_respected() {
    let mut f = setup();
    let l = ledger();
    for (i, on) in ["2025-01-01", "2025-01-02", "2025-01-03"].iter().enumerate() {
        let mut t = on_account(&f, &format!("{}", 10 + i));
        t.date = day(on);
        create_transaction(&mut f.conn, &l, &t).unwrap();
    }
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["cofre", "--user", "alice", "tx", "list", "--limit", "2"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            let rows = transactions::query_rows(&f.conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, day("2025-01-03"));
            assert_eq!(rows[0].amount, "-12.00");
            assert_eq!(rows[0].source, "Corrente");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}

#[test]
fn list_search_folds_accents() {
    let mut f = setup();
    let l = ledger();
    let mut t = on_account(&f, "15");
    t.description = "AÇOUGUE Central".into();
    create_transaction(&mut f.conn, &l, &t).unwrap();
    let other = on_account(&f, "20");
    create_transaction(&mut f.conn, &l, &other).unwrap();

    let matches = cli::build_cli().get_matches_from([
        "cofre", "tx", "list", "--user", "alice", "--search", "açougue",
    ]);
    let (_, tx_m) = matches.subcommand().unwrap();
    let (_, list_m) = tx_m.subcommand().unwrap();
    let rows = transactions::query_rows(&f.conn, list_m).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description, "AÇOUGUE Central");
}

#[test]
fn card_refund_counts_as_income_in_summary() {
    let mut f = setup();
    let refunds = {
        let repo = SqliteRepository::new(&f.conn);
        repo.insert_category("alice", "Estornos", TransactionType::Income, None, None)
            .unwrap()
            .id
    };
    let mut t = NewTransaction::simple(
        "alice",
        "Ticket refund",
        d("50"),
        day("2025-03-07"),
        TransactionType::Income,
        refunds,
    );
    t.payment_method = PaymentMethod::Credit;
    t.credit_card_id = Some(f.visa);
    t.bank_account_id = None;
    let out = create_transaction(&mut f.conn, &ledger(), &t).unwrap();
    assert!(!out.transactions[0].voucher_credit);

    let months = summary::summaries(&f.conn, "alice", &VoucherHeuristic::default()).unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].income_total, d("50"));
    assert_eq!(months[0].food_voucher_total, Decimal::ZERO);
}
