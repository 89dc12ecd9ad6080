// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{load_config, resolve_user};
use crate::models::TransactionType;
use crate::repository::SqliteRepository;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    let repo = SqliteRepository::new(conn);
    match m.subcommand() {
        Some(("add", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim();
            let kind: TransactionType = sub.get_one::<String>("type").unwrap().parse()?;
            let color = sub.get_one::<String>("color").map(|s| s.as_str());
            let icon = sub.get_one::<String>("icon").map(|s| s.as_str());
            repo.insert_category(&user, name, kind, color, icon)
                .with_context(|| format!("Add category '{}'", name))?;
            println!("Added {} category '{}'", kind, name);
        }
        Some(("list", sub)) => {
            let user = resolve_user(&cfg, sub);
            let cats = repo.list_categories(&user)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let rows = cats
                    .into_iter()
                    .map(|c| {
                        vec![
                            c.name,
                            c.kind.to_string(),
                            c.color.unwrap_or_default(),
                            c.icon.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Category", "Type", "Color", "Icon"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let user = resolve_user(&cfg, sub);
            let name = sub.get_one::<String>("name").unwrap().trim();
            let cat = repo.category_by_name(&user, name)?;
            let used: i64 = conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE category_id=?1",
                params![cat.id],
                |r| r.get(0),
            )?;
            if used > 0 {
                anyhow::bail!("Category '{}' is used by {} transaction(s)", name, used);
            }
            conn.execute("DELETE FROM categories WHERE id=?1", params![cat.id])?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
