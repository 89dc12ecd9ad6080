// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Cofre", "cofre"));

/// Environment variable that points the CLI at a specific database file.
pub const DB_ENV: &str = "COFRE_DB";

/// Legacy naming convention for food voucher cards, folded into `card_type`.
pub const LEGACY_VOUCHER_MARKER: &str = "[Vale Alimentação]";

pub fn db_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(DB_ENV) {
        if !p.trim().is_empty() {
            return Ok(PathBuf::from(p.trim()));
        }
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("cofre.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    open_at(&path)
}

pub fn open_at(path: &std::path::Path) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("Open in-memory DB")?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS bank_accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        initial_balance TEXT NOT NULL DEFAULT '0',
        current_balance TEXT NOT NULL DEFAULT '0',
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(user_id, name)
    );

    CREATE TABLE IF NOT EXISTS credit_cards(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        credit_limit TEXT NOT NULL,
        due_day INTEGER NOT NULL CHECK(due_day BETWEEN 1 AND 31),
        closing_day INTEGER NOT NULL CHECK(closing_day BETWEEN 1 AND 31),
        card_type TEXT NOT NULL CHECK(card_type IN ('CREDIT','DEBIT','FOOD_VOUCHER')),
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(user_id, name)
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        color TEXT,
        icon TEXT,
        type TEXT NOT NULL CHECK(type IN ('INCOME','EXPENSE')),
        user_id TEXT NOT NULL,
        UNIQUE(user_id, name, type)
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        amount TEXT NOT NULL,
        date TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('INCOME','EXPENSE')),
        payment_method TEXT NOT NULL CHECK(payment_method IN ('CASH','DEBIT','CREDIT','FOOD_VOUCHER')),
        recurrence_type TEXT NOT NULL DEFAULT 'SINGLE' CHECK(recurrence_type IN ('SINGLE','INSTALLMENT','RECURRING')),
        installments INTEGER,
        current_installment INTEGER,
        category_id INTEGER NOT NULL,
        bank_account_id INTEGER,
        credit_card_id INTEGER,
        voucher_credit INTEGER NOT NULL DEFAULT 0,
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(category_id) REFERENCES categories(id),
        FOREIGN KEY(bank_account_id) REFERENCES bank_accounts(id) ON DELETE SET NULL,
        FOREIGN KEY(credit_card_id) REFERENCES credit_cards(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
    CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(bank_account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_card ON transactions(credit_card_id);

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        month INTEGER NOT NULL CHECK(month BETWEEN 1 AND 12),
        year INTEGER NOT NULL,
        alert_threshold INTEGER NOT NULL DEFAULT 80,
        user_id TEXT NOT NULL,
        UNIQUE(user_id, category_id, month, year),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS goals(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        target_amount TEXT NOT NULL,
        current_amount TEXT NOT NULL DEFAULT '0',
        target_date TEXT,
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    )?;
    migrate_legacy_voucher_cards(conn)?;
    Ok(())
}

/// Cards named with the legacy marker predate `card_type`; promote them once
/// so runtime classification only has to look at the enum.
fn migrate_legacy_voucher_cards(conn: &Connection) -> Result<()> {
    let n = conn.execute(
        "UPDATE credit_cards SET card_type='FOOD_VOUCHER', updated_at=datetime('now')
         WHERE card_type != 'FOOD_VOUCHER' AND instr(name, ?1) > 0",
        [LEGACY_VOUCHER_MARKER],
    )?;
    if n > 0 {
        info!(cards = n, "migrated legacy food voucher cards");
    }
    Ok(())
}
