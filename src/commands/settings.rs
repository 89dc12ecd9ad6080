// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{KNOWN_KEYS, SCHEDULER_TOKEN_KEY, validate_setting};
use crate::utils::{get_setting, pretty_table, set_setting};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("get", sub)) => {
            let keys: Vec<&str> = match sub.get_one::<String>("key") {
                Some(k) => vec![k.trim()],
                None => KNOWN_KEYS.to_vec(),
            };
            let mut rows = Vec::new();
            for k in keys {
                let v = get_setting(conn, k)?.unwrap_or_default();
                // Never echo the shared secret.
                let shown = if k == SCHEDULER_TOKEN_KEY && !v.is_empty() {
                    "********".to_string()
                } else {
                    v
                };
                rows.push(vec![k.to_string(), shown]);
            }
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            let value = sub.get_one::<String>("value").unwrap().trim();
            validate_setting(key, value)?;
            set_setting(conn, key, value)?;
            println!("Set {}", key);
        }
        _ => {}
    }
    Ok(())
}
