// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use cofre::budget::{
    AlertState, DEFAULT_ALERT_THRESHOLD, alert_state, create_budget, get_budget_status,
    percentage, upsert_budget,
};
use cofre::classifier::VoucherHeuristic;
use cofre::db;
use cofre::error::LedgerError;
use cofre::ledger::{Ledger, create_transaction};
use cofre::limits::WindowKind;
use cofre::models::{NewBudget, NewTransaction, RecurrenceType, TransactionType};
use cofre::repository::{RecordRepository, SqliteRepository, TransactionFilter};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> (Connection, i64) {
    let conn = db::open_in_memory().unwrap();
    let dining = {
        let repo = SqliteRepository::new(&conn);
        repo.insert_category("alice", "Restaurantes", TransactionType::Expense, None, None)
            .unwrap()
            .id
    };
    (conn, dining)
}

fn new_budget(category_id: i64, amount: &str) -> NewBudget {
    NewBudget {
        user_id: "alice".into(),
        category_id,
        amount: d(amount),
        month: 3,
        year: 2025,
        alert_threshold: DEFAULT_ALERT_THRESHOLD,
    }
}

fn expense(conn: &mut Connection, category: i64, on: &str, desc: &str, amount: &str, rec: RecurrenceType) {
    let l = Ledger::new(VoucherHeuristic::default(), WindowKind::AllTime, day(on));
    let mut t = NewTransaction::simple("alice", desc, d(amount), day(on), TransactionType::Expense, category);
    t.recurrence_type = rec;
    create_transaction(conn, &l, &t).unwrap();
}

fn status(conn: &Connection, budget: &cofre::models::Budget) -> cofre::budget::BudgetStatus {
    let repo = SqliteRepository::new(conn);
    let txs = repo
        .find_transactions(&TransactionFilter::for_user("alice"))
        .unwrap();
    get_budget_status(budget, &txs)
}

#[test]
fn near_threshold_is_flagged() {
    let (mut conn, dining) = setup();
    let budget = {
        let repo = SqliteRepository::new(&conn);
        create_budget(&repo, &new_budget(dining, "1000")).unwrap()
    };
    expense(&mut conn, dining, "2025-03-03", "Jantar", "500", RecurrenceType::Single);
    expense(&mut conn, dining, "2025-03-09", "Almoço", "320", RecurrenceType::Single);
    // Other months never count.
    expense(&mut conn, dining, "2025-04-01", "Jantar", "900", RecurrenceType::Single);

    let s = status(&conn, &budget);
    assert_eq!(s.spent_amount, d("820"));
    assert_eq!(s.remaining, d("180"));
    assert_eq!(s.percentage, 82);
    assert_eq!(s.state, AlertState::Near);
}

#[test]
fn overspend_caps_percentage() {
    let (mut conn, dining) = setup();
    let budget = {
        let repo = SqliteRepository::new(&conn);
        create_budget(&repo, &new_budget(dining, "200")).unwrap()
    };
    expense(&mut conn, dining, "2025-03-03", "Jantar", "350", RecurrenceType::Single);
    let s = status(&conn, &budget);
    assert_eq!(s.percentage, 100);
    assert_eq!(s.remaining, d("-150"));
    assert_eq!(s.state, AlertState::Over);
}

#[test]
fn recurring_rows_count_once_per_month() {
    let (mut conn, dining) = setup();
    let budget = {
        let repo = SqliteRepository::new(&conn);
        create_budget(&repo, &new_budget(dining, "400")).unwrap()
    };
    expense(&mut conn, dining, "2025-03-01", "Clube", "100", RecurrenceType::Recurring);
    expense(&mut conn, dining, "2025-03-15", "Clube", "100", RecurrenceType::Recurring);
    let s = status(&conn, &budget);
    assert_eq!(s.spent_amount, d("100"));
    assert_eq!(s.percentage, 25);
    assert_eq!(s.state, AlertState::Ok);
}

#[test]
fn rounding_is_half_up() {
    assert_eq!(percentage(d("5"), d("1000")), 1);
    assert_eq!(percentage(d("4.9"), d("1000")), 0);
    assert_eq!(percentage(d("795"), d("1000")), 80);
    assert_eq!(percentage(d("10"), Decimal::ZERO), 0);
    assert_eq!(alert_state(80, 80), AlertState::Near);
    assert_eq!(alert_state(79, 80), AlertState::Ok);

    let p = percentage(d("410"), d("500"));
    assert_eq!((p, alert_state(p, 80)), (82, AlertState::Near));
    let p = percentage(d("500"), d("500"));
    assert_eq!((p, alert_state(p, 80)), (100, AlertState::Over));
}

#[test]
fn tiny_budget_amount_reads_full() {
    let p = percentage(d("1000000000"), d("0.00000000000000000001"));
    assert_eq!(p, 100);
    assert_eq!(alert_state(p, DEFAULT_ALERT_THRESHOLD), AlertState::Over);
    assert_eq!(percentage(d("0.01"), d("0.00000000000000000001")), 100);
    assert_eq!(percentage(Decimal::ZERO, d("0.00000000000000000001")), 0);
}

#[test]
fn second_budget_for_same_month_is_rejected() {
    let (conn, dining) = setup();
    let repo = SqliteRepository::new(&conn);
    create_budget(&repo, &new_budget(dining, "300")).unwrap();
    let err = create_budget(&repo, &new_budget(dining, "999")).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::DuplicateBudget {
            month: 3,
            year: 2025,
            ..
        }
    ));
    let kept = repo.get_budget("alice", dining, 3, 2025).unwrap().unwrap();
    assert_eq!(kept.amount, d("300"));
}

#[test]
fn upsert_replaces_amount_and_threshold() {
    let (conn, dining) = setup();
    let repo = SqliteRepository::new(&conn);
    create_budget(&repo, &new_budget(dining, "300")).unwrap();
    let mut b = new_budget(dining, "450");
    b.alert_threshold = 90;
    let updated = upsert_budget(&repo, &b).unwrap();
    assert_eq!(updated.amount, d("450"));
    assert_eq!(updated.alert_threshold, 90);
    assert_eq!(repo.list_budgets("alice", Some((2025, 3))).unwrap().len(), 1);
}

#[test]
fn invalid_budgets_are_rejected() {
    let (conn, dining) = setup();
    let repo = SqliteRepository::new(&conn);
    let salary = repo
        .insert_category("alice", "Salário", TransactionType::Income, None, None)
        .unwrap();

    let zero = new_budget(dining, "0");
    assert!(matches!(create_budget(&repo, &zero), Err(LedgerError::Validation(_))));

    let mut bad_month = new_budget(dining, "100");
    bad_month.month = 13;
    assert!(matches!(create_budget(&repo, &bad_month), Err(LedgerError::Validation(_))));

    let income = new_budget(salary.id, "100");
    assert!(matches!(create_budget(&repo, &income), Err(LedgerError::Validation(_))));

    let mut foreign = new_budget(dining, "100");
    foreign.user_id = "bob".into();
    assert!(matches!(create_budget(&repo, &foreign), Err(LedgerError::NotFound { .. })));
}
