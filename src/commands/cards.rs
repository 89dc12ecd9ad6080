// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{load_config, resolve_user, today, window_kind};
use crate::db::LEGACY_VOUCHER_MARKER;
use crate::ledger::{Ledger, in_write_tx};
use crate::limits::{LimitStatus, card_limit_status};
use crate::models::CardType;
use crate::repository::{RecordRepository, SqliteRepository};
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim();
            let limit = parse_decimal(sub.get_one::<String>("limit").unwrap())?;
            let due_day = *sub.get_one::<u32>("due_day").unwrap();
            let closing_day = *sub.get_one::<u32>("closing_day").unwrap();
            let mut card_type: CardType = sub.get_one::<String>("type").unwrap().parse()?;
            if name.contains(LEGACY_VOUCHER_MARKER) {
                card_type = CardType::FoodVoucher;
            }
            if limit < rust_decimal::Decimal::ZERO {
                anyhow::bail!("Card limit must not be negative");
            }
            let card = SqliteRepository::new(conn)
                .insert_card(&user, name, limit, due_day, closing_day, card_type)
                .with_context(|| format!("Add card '{}'", name))?;
            println!(
                "Added {} card '{}' with limit {}",
                card.card_type,
                card.name,
                fmt_money(&card.limit)
            );
        }
        Some(("list", sub)) => {
            let user = resolve_user(&cfg, sub);
            let window = window_kind(&cfg, sub)?.at(today());
            let repo = SqliteRepository::new(conn);
            let mut data = Vec::new();
            for card in repo.list_cards(&user)? {
                data.push((card.card_type, card_limit_status(&repo, card.id, window)?));
            }
            let statuses: Vec<&LimitStatus> = data.iter().map(|(_, s)| s).collect();
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &statuses)? {
                let rows = data
                    .iter()
                    .map(|(t, s)| {
                        vec![
                            s.card_name.clone(),
                            t.to_string(),
                            fmt_money(&s.limit),
                            fmt_money(&s.used),
                            fmt_money(&s.available),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Card", "Type", "Limit", "Used", "Available"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim();
            let repo = SqliteRepository::new(conn);
            let card = repo.card_by_name(&user, name)?;
            repo.delete_card(card.id)?;
            println!("Removed card '{}'", name);
        }
        Some(("limit", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim();
            let window = window_kind(&cfg, sub)?.at(today());
            let repo = SqliteRepository::new(conn);
            let card = repo.card_by_name(&user, name)?;
            let status = card_limit_status(&repo, card.id, window)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &status)? {
                let span = match (status.window_start, status.window_end) {
                    (Some(s), Some(e)) => format!("{} .. {}", s, e),
                    _ => "all time".to_string(),
                };
                println!(
                    "{}",
                    pretty_table(
                        &["Card", "Window", "Limit", "Used", "Available"],
                        vec![vec![
                            status.card_name.clone(),
                            span,
                            fmt_money(&status.limit),
                            fmt_money(&status.used),
                            fmt_money(&status.available),
                        ]],
                    )
                );
            }
        }
        Some(("adjust", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            let target = parse_decimal(sub.get_one::<String>("available").unwrap())?;
            let ledger = Ledger::from_config(&cfg, today())?;
            let outcome = in_write_tx(conn, |repo| {
                let card = repo.card_by_name(&user, &name)?;
                ledger.adjust_available_limit(repo, &user, card.id, target)
            })?;
            match outcome {
                Some(o) => {
                    let t = &o.transactions[0];
                    println!(
                        "Booked {} {} on '{}' (transaction {})",
                        t.kind,
                        fmt_money(&t.amount.abs()),
                        name,
                        t.id
                    );
                }
                None => println!("Available limit of '{}' already at {}", name, target),
            }
        }
        _ => {}
    }
    Ok(())
}
