// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use rusqlite::Connection;

use crate::limits::WindowKind;
use crate::utils::get_setting;

pub const DEFAULT_USER_KEY: &str = "default_user";
pub const VOUCHER_PATTERN_KEY: &str = "voucher_credit_pattern";
pub const SCHEDULER_TOKEN_KEY: &str = "scheduler_token";
pub const LIMIT_WINDOW_KEY: &str = "limit_window";

pub const SCHEDULER_TOKEN_ENV: &str = "COFRE_SCHEDULER_TOKEN";

pub const DEFAULT_USER: &str = "default";
pub const DEFAULT_VOUCHER_PATTERN: &str = r"(?i)vale alimentação|va |ticket ";

pub const KNOWN_KEYS: &[&str] = &[
    DEFAULT_USER_KEY,
    VOUCHER_PATTERN_KEY,
    SCHEDULER_TOKEN_KEY,
    LIMIT_WINDOW_KEY,
];

/// Settings gathered from the `settings` table and the environment.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub default_user: String,
    /// Empty string disables the description heuristic.
    pub voucher_credit_pattern: String,
    pub scheduler_token: Option<String>,
    pub limit_window: WindowKind,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            default_user: DEFAULT_USER.to_string(),
            voucher_credit_pattern: DEFAULT_VOUCHER_PATTERN.to_string(),
            scheduler_token: None,
            limit_window: WindowKind::AllTime,
        }
    }
}

impl LedgerConfig {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut cfg = LedgerConfig::default();
        if let Some(u) = get_setting(conn, DEFAULT_USER_KEY)? {
            cfg.default_user = u;
        }
        if let Some(p) = get_setting(conn, VOUCHER_PATTERN_KEY)? {
            cfg.voucher_credit_pattern = p;
        }
        cfg.scheduler_token = match std::env::var(SCHEDULER_TOKEN_ENV) {
            Ok(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
            _ => get_setting(conn, SCHEDULER_TOKEN_KEY)?,
        };
        if let Some(w) = get_setting(conn, LIMIT_WINDOW_KEY)? {
            cfg.limit_window = w.parse()?;
        }
        Ok(cfg)
    }
}

pub fn validate_setting(key: &str, value: &str) -> Result<()> {
    match key {
        VOUCHER_PATTERN_KEY => {
            if !value.is_empty() {
                regex::Regex::new(value)
                    .map_err(|err| anyhow!("Invalid regex pattern '{}': {}", value, err))?;
            }
        }
        LIMIT_WINDOW_KEY => {
            value.parse::<WindowKind>()?;
        }
        DEFAULT_USER_KEY | SCHEDULER_TOKEN_KEY => {
            if value.trim().is_empty() {
                return Err(anyhow!("'{}' cannot be empty", key));
            }
        }
        other => return Err(anyhow!("Unknown setting '{}'", other)),
    }
    Ok(())
}
