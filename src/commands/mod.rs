// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::config::LedgerConfig;
use crate::limits::WindowKind;

pub mod accounts;
pub mod budgets;
pub mod cards;
pub mod categories;
pub mod doctor;
pub mod goals;
pub mod settings;
pub mod summary;
pub mod transactions;
pub mod voucher;

/// `--user` when given, otherwise the configured default user.
pub fn resolve_user(cfg: &LedgerConfig, m: &clap::ArgMatches) -> String {
    m.try_get_one::<String>("user")
        .ok()
        .flatten()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| cfg.default_user.clone())
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn window_kind(cfg: &LedgerConfig, m: &clap::ArgMatches) -> Result<WindowKind> {
    match m.try_get_one::<String>("window").ok().flatten() {
        Some(w) => Ok(w.parse()?),
        None => Ok(cfg.limit_window),
    }
}

pub fn load_config(conn: &Connection) -> Result<LedgerConfig> {
    LedgerConfig::load(conn)
}
