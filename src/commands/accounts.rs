// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::balance::{account_balance, recompute_bank_account_balance};
use crate::commands::{load_config, resolve_user};
use crate::ledger::in_write_tx;
use crate::repository::SqliteRepository;
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim();
            let initial = parse_decimal(sub.get_one::<String>("initial").unwrap())?;
            let account = SqliteRepository::new(conn)
                .insert_account(&user, name, initial)
                .with_context(|| format!("Add account '{}'", name))?;
            println!(
                "Added account '{}' with initial balance {}",
                account.name,
                fmt_money(&account.initial_balance)
            );
        }
        Some(("list", sub)) => list(conn, &resolve_user(&cfg, sub), sub)?,
        Some(("rm", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim();
            let repo = SqliteRepository::new(conn);
            let account = repo.account_by_name(&user, name)?;
            repo.delete_account(account.id)?;
            println!("Removed account '{}'", name);
        }
        Some(("recompute", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").map(|s| s.trim().to_string());
            let rows = in_write_tx(conn, |repo| {
                let accounts = match &name {
                    Some(n) => vec![repo.account_by_name(&user, n)?],
                    None => repo.list_accounts(&user)?,
                };
                let mut rows = Vec::new();
                for a in accounts {
                    let bal = recompute_bank_account_balance(repo, a.id)?;
                    rows.push(vec![a.name, fmt_money(&a.current_balance), fmt_money(&bal)]);
                }
                Ok(rows)
            })?;
            println!(
                "{}",
                pretty_table(&["Account", "Cached", "Recomputed"], rows)
            );
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountRow {
    id: i64,
    name: String,
    initial_balance: String,
    current_balance: String,
}

fn list(conn: &Connection, user: &str, sub: &clap::ArgMatches) -> Result<()> {
    let repo = SqliteRepository::new(conn);
    let mut data = Vec::new();
    for a in repo.list_accounts(user)? {
        // Read path recomputes; the cached column may lag behind.
        let bal = account_balance(&repo, a.id)?;
        data.push(AccountRow {
            id: a.id,
            name: a.name,
            initial_balance: fmt_money(&a.initial_balance),
            current_balance: fmt_money(&bal),
        });
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|r| vec![r.name, r.initial_balance, r.current_balance])
            .collect();
        println!("{}", pretty_table(&["Account", "Initial", "Balance"], rows));
    }
    Ok(())
}
