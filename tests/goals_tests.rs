// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use cofre::db;
use cofre::error::LedgerError;
use cofre::goals::{Contribution, contribute, create_goal, get_goal, list_goals};
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn contributions_move_towards_target() {
    let conn = db::open_in_memory().unwrap();
    let goal = create_goal(
        &conn,
        "alice",
        "Viagem",
        d("3000"),
        NaiveDate::from_ymd_opt(2025, 12, 1),
    )
    .unwrap();
    assert_eq!(goal.current_amount, Decimal::ZERO);

    let g = contribute(&conn, "alice", goal.id, Contribution::Add, d("1200")).unwrap();
    assert_eq!(g.current_amount, d("1200"));
    assert!(!g.completed());

    let g = contribute(&conn, "alice", goal.id, Contribution::Subtract, d("5000")).unwrap();
    assert_eq!(g.current_amount, Decimal::ZERO);

    let g = contribute(&conn, "alice", goal.id, Contribution::Set, d("3000")).unwrap();
    assert!(g.completed());
}

#[test]
fn goals_are_scoped_to_their_owner() {
    let conn = db::open_in_memory().unwrap();
    let goal = create_goal(&conn, "alice", "Reserva", d("10000"), None).unwrap();
    create_goal(&conn, "bob", "Carro", d("40000"), None).unwrap();

    assert_eq!(list_goals(&conn, "alice").unwrap().len(), 1);
    assert!(get_goal(&conn, "bob", goal.id).unwrap_err().is_not_found());
}

#[test]
fn bad_input_is_rejected() {
    let conn = db::open_in_memory().unwrap();
    assert!(matches!(
        create_goal(&conn, "alice", "  ", d("10"), None),
        Err(LedgerError::Validation(_))
    ));
    assert!(matches!(
        create_goal(&conn, "alice", "Casa", d("0"), None),
        Err(LedgerError::Validation(_))
    ));
    let goal = create_goal(&conn, "alice", "Casa", d("100"), None).unwrap();
    assert!(contribute(&conn, "alice", goal.id, Contribution::Add, d("-1")).is_err());
    assert!("withdraw".parse::<Contribution>().is_err());
    assert_eq!("SET".parse::<Contribution>().unwrap(), Contribution::Set);
}
