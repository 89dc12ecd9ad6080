// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{LedgerError, Result};
use crate::models::FinancialGoal;
use crate::utils::decimal_col;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    Add,
    Subtract,
    Set,
}

impl FromStr for Contribution {
    type Err = LedgerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Contribution::Add),
            "subtract" => Ok(Contribution::Subtract),
            "set" => Ok(Contribution::Set),
            other => Err(LedgerError::validation(format!(
                "invalid operation '{}', expected add|subtract|set",
                other
            ))),
        }
    }
}

impl Contribution {
    /// New saved amount; subtracting never goes below zero.
    pub fn apply(self, current: Decimal, amount: Decimal) -> Result<Decimal> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::validation("contribution must not be negative"));
        }
        Ok(match self {
            Contribution::Add => current + amount,
            Contribution::Subtract => (current - amount).max(Decimal::ZERO),
            Contribution::Set => amount,
        })
    }
}

fn goal_from_row(r: &Row<'_>) -> rusqlite::Result<FinancialGoal> {
    Ok(FinancialGoal {
        id: r.get(0)?,
        name: r.get(1)?,
        target_amount: decimal_col(r, 2)?,
        current_amount: decimal_col(r, 3)?,
        target_date: r.get(4)?,
        user_id: r.get(5)?,
    })
}

pub fn create_goal(
    conn: &Connection,
    user_id: &str,
    name: &str,
    target_amount: Decimal,
    target_date: Option<NaiveDate>,
) -> Result<FinancialGoal> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("goal name is required"));
    }
    if target_amount <= Decimal::ZERO {
        return Err(LedgerError::validation("target amount must be greater than 0"));
    }
    conn.execute(
        "INSERT INTO goals(name, target_amount, target_date, user_id) VALUES (?1, ?2, ?3, ?4)",
        params![name.trim(), target_amount.to_string(), target_date, user_id],
    )?;
    get_goal(conn, user_id, conn.last_insert_rowid())
}

pub fn get_goal(conn: &Connection, user_id: &str, id: i64) -> Result<FinancialGoal> {
    conn.query_row(
        "SELECT id, name, target_amount, current_amount, target_date, user_id
         FROM goals WHERE id=?1 AND user_id=?2",
        params![id, user_id],
        goal_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("goal", id))
}

pub fn list_goals(conn: &Connection, user_id: &str) -> Result<Vec<FinancialGoal>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, target_amount, current_amount, target_date, user_id
         FROM goals WHERE user_id=?1 ORDER BY target_date IS NULL, target_date, name",
    )?;
    let rows = stmt.query_map(params![user_id], goal_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn contribute(
    conn: &Connection,
    user_id: &str,
    id: i64,
    op: Contribution,
    amount: Decimal,
) -> Result<FinancialGoal> {
    let goal = get_goal(conn, user_id, id)?;
    let next = op.apply(goal.current_amount, amount)?;
    conn.execute(
        "UPDATE goals SET current_amount=?1 WHERE id=?2",
        params![next.to_string(), id],
    )?;
    get_goal(conn, user_id, id)
}
