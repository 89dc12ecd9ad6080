// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{load_config, resolve_user, today};
use crate::ledger::in_write_tx;
use crate::utils::{fmt_money, maybe_print_json, parse_date, pretty_table};
use crate::voucher::{ResetRequest, run_reset};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("reset", sub)) => reset(conn, sub),
        _ => Ok(()),
    }
}

fn reset(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let request = ResetRequest {
        scheduler_token: sub.get_one::<String>("token").map(|s| s.trim().to_string()),
        force: sub.get_flag("force"),
        first_day: sub.get_flag("first_day"),
        manual: sub.get_flag("manual"),
        user_id: if sub.get_flag("all_users") {
            None
        } else {
            Some(resolve_user(&cfg, sub))
        },
    };
    let token = cfg.scheduler_token.clone();
    let report = in_write_tx(conn, |repo| run_reset(repo, &request, token.as_deref(), date))?;

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &report)? {
        println!("{}", report.message);
        if !report.resets.is_empty() {
            let rows = report
                .resets
                .iter()
                .map(|r| {
                    vec![
                        r.card_name.clone(),
                        r.user_id.clone(),
                        fmt_money(&r.reset_amount),
                        r.transaction_id
                            .map(|id| id.to_string())
                            .or_else(|| r.message.clone())
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Card", "User", "Reset", "Transaction"], rows)
            );
        }
        for f in &report.failures {
            eprintln!("reset failed for '{}': {}", f.card_name, f.error);
        }
    }
    Ok(())
}
