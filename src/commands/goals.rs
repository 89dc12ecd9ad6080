// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{load_config, resolve_user};
use crate::goals::{Contribution, contribute, create_goal, list_goals};
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap();
            let target = parse_decimal(sub.get_one::<String>("target").unwrap())?;
            let date = match sub.get_one::<String>("date") {
                Some(d) => Some(parse_date(d)?),
                None => None,
            };
            let g = create_goal(conn, &user, name, target, date)?;
            println!("Added goal '{}' (id {}) target {}", g.name, g.id, fmt_money(&g.target_amount));
        }
        Some(("list", sub)) => {
            let user = resolve_user(&cfg, sub);
            let goals = list_goals(conn, &user)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &goals)? {
                let rows = goals
                    .iter()
                    .map(|g| {
                        vec![
                            g.id.to_string(),
                            g.name.clone(),
                            fmt_money(&g.current_amount),
                            fmt_money(&g.target_amount),
                            g.target_date.map(|d| d.to_string()).unwrap_or_default(),
                            if g.completed() { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Goal", "Saved", "Target", "By", "Done"], rows)
                );
            }
        }
        Some(("contribute", sub)) => {
            let user = resolve_user(&cfg, sub);
            let id = *sub.get_one::<i64>("id").unwrap();
            let op: Contribution = sub.get_one::<String>("op").unwrap().parse()?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let g = contribute(conn, &user, id, op, amount)?;
            println!(
                "Goal '{}' now at {} of {}{}",
                g.name,
                fmt_money(&g.current_amount),
                fmt_money(&g.target_amount),
                if g.completed() { " (completed)" } else { "" }
            );
        }
        _ => {}
    }
    Ok(())
}
