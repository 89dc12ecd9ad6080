// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::budget::{BudgetStatus, create_budget, get_budget_status, upsert_budget};
use crate::commands::{load_config, resolve_user};
use crate::error::LedgerError;
use crate::models::{NewBudget, TransactionType};
use crate::repository::{RecordRepository, SqliteRepository, TransactionFilter};
use crate::utils::{
    first_day_of_month, fmt_money, last_day_of_month, maybe_print_json, parse_decimal,
    parse_month, pretty_table,
};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub, false)?,
        Some(("set", sub)) => add(conn, sub, true)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("status", sub)) => status(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches, replace: bool) -> Result<()> {
    let cfg = load_config(conn)?;
    let user = resolve_user(&cfg, sub);
    let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
    let cat = sub.get_one::<String>("category").unwrap().trim();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let threshold = *sub.get_one::<u32>("threshold").unwrap();

    let repo = SqliteRepository::new(conn);
    let category = repo
        .list_categories(&user)?
        .into_iter()
        .find(|c| c.name == cat && c.kind == TransactionType::Expense)
        .ok_or_else(|| anyhow!("Expense category '{}' not found", cat))?;
    let nb = NewBudget {
        user_id: user,
        category_id: category.id,
        amount,
        month,
        year,
        alert_threshold: threshold,
    };
    let res = if replace {
        upsert_budget(&repo, &nb)
    } else {
        create_budget(&repo, &nb)
    };
    match res {
        Ok(b) => println!(
            "Budget set for {:04}-{:02} / {} = {} (alert at {}%)",
            b.year,
            b.month,
            cat,
            fmt_money(&b.amount),
            b.alert_threshold
        ),
        Err(LedgerError::DuplicateBudget { .. }) => {
            return Err(anyhow!(
                "A budget for '{}' in {:04}-{:02} already exists; use `budget set` to change it",
                cat,
                year,
                month
            ));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    let user = resolve_user(&cfg, sub);
    let period = match sub.get_one::<String>("month") {
        Some(m) => Some(parse_month(m)?),
        None => None,
    };
    let repo = SqliteRepository::new(conn);
    let budgets = repo.list_budgets(&user, period)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &budgets)? {
        let cats = repo.list_categories(&user)?;
        let rows = budgets
            .iter()
            .map(|b| {
                vec![
                    format!("{:04}-{:02}", b.year, b.month),
                    cats.iter()
                        .find(|c| c.id == b.category_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                    fmt_money(&b.amount),
                    format!("{}%", b.alert_threshold),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Month", "Category", "Budget", "Alert at"], rows)
        );
    }
    Ok(())
}

/// Status of every budget in the month.
pub fn month_status(conn: &Connection, user: &str, year: i32, month: u32) -> Result<Vec<BudgetStatus>> {
    let repo = SqliteRepository::new(conn);
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| anyhow!("Invalid month"))?;
    let filter = TransactionFilter {
        kind: Some(TransactionType::Expense),
        ..TransactionFilter::for_user(user)
    }
    .between(first_day_of_month(first), last_day_of_month(first));
    let txs = repo.find_transactions(&filter)?;
    Ok(repo
        .list_budgets(user, Some((year, month)))?
        .iter()
        .map(|b| get_budget_status(b, &txs))
        .collect())
}

fn status(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    let user = resolve_user(&cfg, sub);
    let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
    let data = month_status(conn, &user, year, month)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let cats = SqliteRepository::new(conn).list_categories(&user)?;
        let rows = data
            .iter()
            .map(|s| {
                vec![
                    cats.iter()
                        .find(|c| c.id == s.budget.category_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                    fmt_money(&s.budget.amount),
                    fmt_money(&s.spent_amount),
                    fmt_money(&s.remaining),
                    format!("{}%", s.percentage),
                    format!("{:?}", s.state).to_uppercase(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Category", "Budget", "Spent", "Remaining", "Used", "State"],
                rows
            )
        );
    }
    Ok(())
}
