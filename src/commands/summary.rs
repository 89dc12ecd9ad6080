// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::classifier::{Classifier, VoucherHeuristic};
use crate::commands::{load_config, resolve_user};
use crate::monthly::{MonthSummary, group_by_month};
use crate::repository::{RecordRepository, SqliteRepository, TransactionFilter};
use crate::utils::{fmt_money, maybe_print_json, parse_month, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

/// Month summaries for the user, newest first.
pub fn summaries(conn: &Connection, user: &str, heuristic: &VoucherHeuristic) -> Result<Vec<MonthSummary>> {
    let repo = SqliteRepository::new(conn);
    let cards = repo.list_cards(user)?;
    let txs = repo.find_transactions(&TransactionFilter::for_user(user))?;
    let classifier = Classifier::new(&cards, heuristic);
    Ok(group_by_month(&txs, &classifier))
}

pub fn handle(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    let user = resolve_user(&cfg, sub);
    let heuristic = VoucherHeuristic::new(&cfg.voucher_credit_pattern)?;
    let months = *sub.get_one::<usize>("months").unwrap_or(&12);

    let mut data = summaries(conn, &user, &heuristic)?;
    if let Some(m) = sub.get_one::<String>("month") {
        let (y, mo) = parse_month(m)?;
        data.retain(|s| s.year == y && s.month == mo);
    } else {
        data.truncate(months);
    }

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|s| {
                vec![
                    s.month_key.clone(),
                    fmt_money(&s.income_total),
                    fmt_money(&s.expense_total),
                    fmt_money(&s.balance),
                    fmt_money(&s.food_voucher_total),
                    s.transactions.len().to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Month", "Income", "Expense", "Balance", "Food voucher", "Rows"],
                rows
            )
        );
    }
    Ok(())
}
