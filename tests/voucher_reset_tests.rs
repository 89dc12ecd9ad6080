// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use cofre::classifier::VoucherHeuristic;
use cofre::db;
use cofre::error::LedgerError;
use cofre::ledger::{Ledger, create_transaction, in_write_tx};
use cofre::limits::{BillingWindow, WindowKind, compute_available_limit};
use cofre::models::{CardType, NewTransaction, TransactionType};
use cofre::repository::{RecordRepository, SqliteRepository, TransactionFilter};
use cofre::voucher::{ResetRequest, ResetTrigger, is_reset_marker, run_reset};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

const TOKEN: &str = "s3cret";

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// A user with a 700 voucher card; `with_income` controls whether an income
/// category exists to book resets against.
fn add_user(conn: &Connection, user: &str, with_income: bool) -> (i64, i64) {
    let repo = SqliteRepository::new(conn);
    let card = repo
        .insert_card(user, "VA", d("700"), 1, 1, CardType::FoodVoucher)
        .unwrap();
    let food = repo
        .insert_category(user, "Alimentação", TransactionType::Expense, None, None)
        .unwrap();
    if with_income {
        repo.insert_category(user, "Benefícios", TransactionType::Income, None, None)
            .unwrap();
    }
    (card.id, food.id)
}

fn spend(conn: &mut Connection, user: &str, card: i64, category: i64, on: &str, amount: &str) {
    let l = Ledger::new(VoucherHeuristic::default(), WindowKind::AllTime, day(on));
    let mut t = NewTransaction::simple(user, "Restaurante", d(amount), day(on), TransactionType::Expense, category);
    // The card type alone decides the channel.
    t.credit_card_id = Some(card);
    t.payment_method = cofre::models::PaymentMethod::Credit;
    create_transaction(conn, &l, &t).unwrap();
}

fn manual(user: &str) -> ResetRequest {
    ResetRequest {
        manual: true,
        user_id: Some(user.into()),
        ..Default::default()
    }
}

fn scheduled() -> ResetRequest {
    ResetRequest {
        scheduler_token: Some(TOKEN.into()),
        ..Default::default()
    }
}

fn markers(conn: &Connection, user: &str, card: i64, month: NaiveDate) -> usize {
    let repo = SqliteRepository::new(conn);
    repo.find_transactions(&TransactionFilter::for_user(user))
        .unwrap()
        .iter()
        .filter(|t| is_reset_marker(t, card, month))
        .count()
}

#[test]
fn reset_restores_full_limit() {
    let mut conn = db::open_in_memory().unwrap();
    let (card, food) = add_user(&conn, "alice", true);
    spend(&mut conn, "alice", card, food, "2025-03-10", "180");
    {
        let repo = SqliteRepository::new(&conn);
        assert_eq!(
            compute_available_limit(&repo, card, BillingWindow::AllTime).unwrap(),
            d("520")
        );
    }

    let today = day("2025-03-15");
    let report =
        in_write_tx(&mut conn, |repo| run_reset(repo, &manual("alice"), Some(TOKEN), today)).unwrap();
    assert!(report.success);
    assert!(!report.was_skipped);
    assert_eq!(report.trigger, ResetTrigger::Manual);
    assert_eq!(report.resets.len(), 1);
    assert_eq!(report.resets[0].reset_amount, d("180"));

    let repo = SqliteRepository::new(&conn);
    assert_eq!(
        compute_available_limit(&repo, card, BillingWindow::AllTime).unwrap(),
        d("700")
    );
    let marker = repo
        .get_transaction(report.resets[0].transaction_id.unwrap())
        .unwrap();
    assert_eq!(marker.description, "[VALE ALIMENTAÇÃO] Reset Manual - VA");
    assert!(marker.voucher_credit);
}

#[test]
fn scheduled_reset_runs_once_per_month() {
    let mut conn = db::open_in_memory().unwrap();
    let (card, food) = add_user(&conn, "alice", true);
    spend(&mut conn, "alice", card, food, "2025-03-10", "150");
    let today = day("2025-03-15");

    let first = in_write_tx(&mut conn, |repo| run_reset(repo, &scheduled(), Some(TOKEN), today)).unwrap();
    assert!(!first.was_skipped);
    let second = in_write_tx(&mut conn, |repo| run_reset(repo, &scheduled(), Some(TOKEN), today)).unwrap();
    assert!(second.was_skipped);
    assert_eq!(second.skipped_users, vec!["alice".to_string()]);

    assert_eq!(markers(&conn, "alice", card, today), 1);
    let repo = SqliteRepository::new(&conn);
    assert_eq!(
        compute_available_limit(&repo, card, BillingWindow::AllTime).unwrap(),
        d("700")
    );
}

#[test]
fn forced_reset_replaces_the_marker() {
    let mut conn = db::open_in_memory().unwrap();
    let (card, food) = add_user(&conn, "alice", true);
    spend(&mut conn, "alice", card, food, "2025-03-10", "150");
    let today = day("2025-03-15");
    in_write_tx(&mut conn, |repo| run_reset(repo, &scheduled(), Some(TOKEN), today)).unwrap();

    spend(&mut conn, "alice", card, food, "2025-03-16", "50");
    let forced = ResetRequest {
        force: true,
        user_id: Some("alice".into()),
        ..Default::default()
    };
    let report = in_write_tx(&mut conn, |repo| run_reset(repo, &forced, Some(TOKEN), today)).unwrap();
    assert_eq!(report.trigger, ResetTrigger::Forced);
    assert_eq!(report.resets[0].reset_amount, d("200"));
    assert_eq!(markers(&conn, "alice", card, today), 1);

    let repo = SqliteRepository::new(&conn);
    assert_eq!(
        compute_available_limit(&repo, card, BillingWindow::AllTime).unwrap(),
        d("700")
    );
}

#[test]
fn scheduler_token_is_checked() {
    let mut conn = db::open_in_memory().unwrap();
    add_user(&conn, "alice", true);
    let today = day("2025-03-15");

    let wrong = ResetRequest {
        scheduler_token: Some("guess".into()),
        ..Default::default()
    };
    let err = in_write_tx(&mut conn, |repo| run_reset(repo, &wrong, Some(TOKEN), today)).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized));

    let missing = ResetRequest::default();
    let err = in_write_tx(&mut conn, |repo| run_reset(repo, &missing, Some(TOKEN), today)).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized));

    // No configured token means no scheduler access at all.
    let err = in_write_tx(&mut conn, |repo| run_reset(repo, &scheduled(), None, today)).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized));
}

#[test]
fn first_day_trigger_skips_other_days() {
    let mut conn = db::open_in_memory().unwrap();
    let (card, _) = add_user(&conn, "alice", true);
    let req = ResetRequest {
        scheduler_token: Some(TOKEN.into()),
        first_day: true,
        ..Default::default()
    };

    let mid = in_write_tx(&mut conn, |repo| run_reset(repo, &req, Some(TOKEN), day("2025-04-15"))).unwrap();
    assert!(mid.was_skipped);
    assert_eq!(mid.trigger, ResetTrigger::FirstDay);

    let first = in_write_tx(&mut conn, |repo| run_reset(repo, &req, Some(TOKEN), day("2025-04-01"))).unwrap();
    assert!(!first.was_skipped);
    assert_eq!(first.resets[0].reset_amount, Decimal::ZERO);
    assert!(first.resets[0].transaction_id.is_none());
    assert_eq!(markers(&conn, "alice", card, day("2025-04-01")), 0);
}

#[test]
fn one_failing_card_does_not_block_the_rest() {
    let mut conn = db::open_in_memory().unwrap();
    let (alice_card, alice_food) = add_user(&conn, "alice", true);
    let (bob_card, bob_food) = add_user(&conn, "bob", false);
    spend(&mut conn, "alice", alice_card, alice_food, "2025-03-03", "90");
    spend(&mut conn, "bob", bob_card, bob_food, "2025-03-04", "60");

    let today = day("2025-03-15");
    let report = in_write_tx(&mut conn, |repo| run_reset(repo, &scheduled(), Some(TOKEN), today)).unwrap();
    assert!(report.success);
    assert_eq!(report.resets.len(), 1);
    assert_eq!(report.resets[0].user_id, "alice");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].card_id, bob_card);

    assert_eq!(markers(&conn, "alice", alice_card, today), 1);
    assert_eq!(markers(&conn, "bob", bob_card, today), 0);
}

#[test]
fn manual_reset_needs_a_user() {
    let mut conn = db::open_in_memory().unwrap();
    add_user(&conn, "alice", true);
    let req = ResetRequest {
        manual: true,
        ..Default::default()
    };
    let err = in_write_tx(&mut conn, |repo| run_reset(repo, &req, None, day("2025-03-15"))).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}
