// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Data access for the reconciliation core.
//!
//! Everything above this module talks to the store through
//! [`RecordRepository`]; [`SqliteRepository`] is the implementation used by
//! the CLI and the tests. It borrows a plain `Connection`, so it works the
//! same on a bare connection or inside a `rusqlite::Transaction`.

use chrono::NaiveDate;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use tracing::trace;

use crate::error::{LedgerError, Result};
use crate::models::{
    BankAccount, Budget, CardType, Category, CreditCard, NewBudget, NewTransaction, Transaction,
    TransactionPatch, TransactionType,
};
use crate::utils::decimal_col;

/// Query parameters for [`RecordRepository::find_transactions`].
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub bank_account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    /// Case-insensitive substring match on the description.
    pub description: Option<String>,
    pub kind: Option<TransactionType>,
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn for_user(user_id: &str) -> Self {
        TransactionFilter {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }
}

pub trait RecordRepository {
    fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;
    fn get_transaction(&self, id: i64) -> Result<Transaction>;
    fn create_transaction(&self, data: &NewTransaction) -> Result<Transaction>;
    fn update_transaction(&self, id: i64, patch: &TransactionPatch) -> Result<Transaction>;
    fn delete_transaction(&self, id: i64) -> Result<()>;

    fn get_account(&self, id: i64) -> Result<BankAccount>;
    fn update_account_balance(&self, id: i64, value: Decimal) -> Result<()>;

    fn get_card(&self, id: i64) -> Result<CreditCard>;
    fn list_cards(&self, user_id: &str) -> Result<Vec<CreditCard>>;
    /// All food voucher cards, optionally restricted to one user.
    fn list_food_voucher_cards(&self, user_id: Option<&str>) -> Result<Vec<CreditCard>>;

    fn get_category(&self, id: i64) -> Result<Category>;
    fn get_categories_by_type(&self, user_id: &str, kind: TransactionType)
    -> Result<Vec<Category>>;

    fn get_budget(
        &self,
        user_id: &str,
        category_id: i64,
        month: u32,
        year: i32,
    ) -> Result<Option<Budget>>;
    fn insert_budget(&self, budget: &NewBudget) -> Result<Budget>;
    fn upsert_budget(&self, budget: &NewBudget) -> Result<Budget>;
}

const TX_COLUMNS: &str = "id, description, amount, date, type, payment_method, recurrence_type, \
     installments, current_installment, category_id, bank_account_id, credit_card_id, \
     voucher_credit, user_id, created_at, updated_at";

const ACCOUNT_COLUMNS: &str =
    "id, name, initial_balance, current_balance, user_id, created_at, updated_at";

const CARD_COLUMNS: &str =
    "id, name, credit_limit, due_day, closing_day, card_type, user_id, created_at, updated_at";

const BUDGET_COLUMNS: &str = "id, category_id, amount, month, year, alert_threshold, user_id";

fn transaction_from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        description: r.get(1)?,
        amount: decimal_col(r, 2)?,
        date: r.get(3)?,
        kind: r.get(4)?,
        payment_method: r.get(5)?,
        recurrence_type: r.get(6)?,
        installments: r.get(7)?,
        current_installment: r.get(8)?,
        category_id: r.get(9)?,
        bank_account_id: r.get(10)?,
        credit_card_id: r.get(11)?,
        voucher_credit: r.get(12)?,
        user_id: r.get(13)?,
        created_at: r.get(14)?,
        updated_at: r.get(15)?,
    })
}

fn account_from_row(r: &Row<'_>) -> rusqlite::Result<BankAccount> {
    Ok(BankAccount {
        id: r.get(0)?,
        name: r.get(1)?,
        initial_balance: decimal_col(r, 2)?,
        current_balance: decimal_col(r, 3)?,
        user_id: r.get(4)?,
        created_at: r.get(5)?,
        updated_at: r.get(6)?,
    })
}

fn card_from_row(r: &Row<'_>) -> rusqlite::Result<CreditCard> {
    Ok(CreditCard {
        id: r.get(0)?,
        name: r.get(1)?,
        limit: decimal_col(r, 2)?,
        due_day: r.get(3)?,
        closing_day: r.get(4)?,
        card_type: r.get(5)?,
        user_id: r.get(6)?,
        created_at: r.get(7)?,
        updated_at: r.get(8)?,
    })
}

fn category_from_row(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        name: r.get(1)?,
        color: r.get(2)?,
        icon: r.get(3)?,
        kind: r.get(4)?,
        user_id: r.get(5)?,
    })
}

fn budget_from_row(r: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: r.get(0)?,
        category_id: r.get(1)?,
        amount: decimal_col(r, 2)?,
        month: r.get(3)?,
        year: r.get(4)?,
        alert_threshold: r.get(5)?,
        user_id: r.get(6)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

pub struct SqliteRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SqliteRepository { conn }
    }

    pub fn list_accounts(&self, user_id: &str) -> Result<Vec<BankAccount>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE user_id=?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![user_id], account_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn insert_account(
        &self,
        user_id: &str,
        name: &str,
        initial_balance: Decimal,
    ) -> Result<BankAccount> {
        self.conn.execute(
            "INSERT INTO bank_accounts(name, initial_balance, current_balance, user_id)
             VALUES (?1, ?2, ?2, ?3)",
            params![name, initial_balance.to_string(), user_id],
        )?;
        self.get_account(self.conn.last_insert_rowid())
    }

    pub fn account_by_name(&self, user_id: &str, name: &str) -> Result<BankAccount> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE user_id=?1 AND name=?2"
                ),
                params![user_id, name],
                account_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("account", name))
    }

    pub fn delete_account(&self, id: i64) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM bank_accounts WHERE id=?1", params![id])?;
        if n == 0 {
            return Err(LedgerError::not_found("account", id));
        }
        Ok(())
    }

    pub fn insert_card(
        &self,
        user_id: &str,
        name: &str,
        limit: Decimal,
        due_day: u32,
        closing_day: u32,
        card_type: CardType,
    ) -> Result<CreditCard> {
        self.conn.execute(
            "INSERT INTO credit_cards(name, credit_limit, due_day, closing_day, card_type, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                limit.to_string(),
                due_day,
                closing_day,
                card_type,
                user_id
            ],
        )?;
        self.get_card(self.conn.last_insert_rowid())
    }

    pub fn card_by_name(&self, user_id: &str, name: &str) -> Result<CreditCard> {
        self.conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM credit_cards WHERE user_id=?1 AND name=?2"),
                params![user_id, name],
                card_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("card", name))
    }

    pub fn delete_card(&self, id: i64) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM credit_cards WHERE id=?1", params![id])?;
        if n == 0 {
            return Err(LedgerError::not_found("card", id));
        }
        Ok(())
    }

    pub fn insert_category(
        &self,
        user_id: &str,
        name: &str,
        kind: TransactionType,
        color: Option<&str>,
        icon: Option<&str>,
    ) -> Result<Category> {
        self.conn.execute(
            "INSERT INTO categories(name, color, icon, type, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, color, icon, kind, user_id],
        )?;
        self.get_category(self.conn.last_insert_rowid())
    }

    pub fn list_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, icon, type, user_id FROM categories
             WHERE user_id=?1 ORDER BY type, name",
        )?;
        let rows = stmt.query_map(params![user_id], category_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn category_by_name(&self, user_id: &str, name: &str) -> Result<Category> {
        self.conn
            .query_row(
                "SELECT id, name, color, icon, type, user_id FROM categories
                 WHERE user_id=?1 AND name=?2 ORDER BY id LIMIT 1",
                params![user_id, name],
                category_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("category", name))
    }

    pub fn list_budgets(&self, user_id: &str, period: Option<(i32, u32)>) -> Result<Vec<Budget>> {
        let mut out = Vec::new();
        match period {
            Some((year, month)) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {BUDGET_COLUMNS} FROM budgets
                     WHERE user_id=?1 AND year=?2 AND month=?3 ORDER BY category_id"
                ))?;
                for b in stmt.query_map(params![user_id, year, month], budget_from_row)? {
                    out.push(b?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {BUDGET_COLUMNS} FROM budgets
                     WHERE user_id=?1 ORDER BY year DESC, month DESC, category_id"
                ))?;
                for b in stmt.query_map(params![user_id], budget_from_row)? {
                    out.push(b?);
                }
            }
        }
        Ok(out)
    }
}

impl RecordRepository for SqliteRepository<'_> {
    fn find_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut sql = format!("SELECT {TX_COLUMNS} FROM transactions WHERE user_id=?");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(filter.user_id.clone())];

        if let Some(from) = filter.from {
            sql.push_str(" AND date>=?");
            args.push(Box::new(from));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND date<=?");
            args.push(Box::new(to));
        }
        if let Some(c) = filter.category_id {
            sql.push_str(" AND category_id=?");
            args.push(Box::new(c));
        }
        if let Some(a) = filter.bank_account_id {
            sql.push_str(" AND bank_account_id=?");
            args.push(Box::new(a));
        }
        if let Some(c) = filter.credit_card_id {
            sql.push_str(" AND credit_card_id=?");
            args.push(Box::new(c));
        }
        if let Some(k) = filter.kind {
            sql.push_str(" AND type=?");
            args.push(Box::new(k));
        }
        sql.push_str(" ORDER BY date DESC, id DESC");
        trace!(%sql, "find_transactions");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            transaction_from_row,
        )?;

        // SQLite's lower()/LIKE only fold ASCII, so the text match runs here.
        let needle = filter
            .description
            .as_ref()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());
        let mut out = Vec::new();
        for row in rows {
            let t = row?;
            if let Some(n) = &needle {
                if !t.description.to_lowercase().contains(n.as_str()) {
                    continue;
                }
            }
            out.push(t);
            if filter.limit.is_some_and(|l| out.len() >= l) {
                break;
            }
        }
        Ok(out)
    }

    fn get_transaction(&self, id: i64) -> Result<Transaction> {
        self.conn
            .query_row(
                &format!("SELECT {TX_COLUMNS} FROM transactions WHERE id=?1"),
                params![id],
                transaction_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("transaction", id))
    }

    fn create_transaction(&self, data: &NewTransaction) -> Result<Transaction> {
        self.conn.execute(
            "INSERT INTO transactions(description, amount, date, type, payment_method,
                recurrence_type, installments, current_installment, category_id,
                bank_account_id, credit_card_id, voucher_credit, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                data.description,
                data.amount.to_string(),
                data.date,
                data.kind,
                data.payment_method,
                data.recurrence_type,
                data.installments,
                data.current_installment,
                data.category_id,
                data.bank_account_id,
                data.credit_card_id,
                data.voucher_credit,
                data.user_id,
            ],
        )?;
        self.get_transaction(self.conn.last_insert_rowid())
    }

    fn update_transaction(&self, id: i64, patch: &TransactionPatch) -> Result<Transaction> {
        let t = self.get_transaction(id)?.with_patch(patch);
        self.conn.execute(
            "UPDATE transactions SET description=?1, amount=?2, date=?3, type=?4,
                payment_method=?5, recurrence_type=?6, installments=?7, current_installment=?8,
                category_id=?9, bank_account_id=?10, credit_card_id=?11, voucher_credit=?12,
                updated_at=datetime('now')
             WHERE id=?13",
            params![
                t.description,
                t.amount.to_string(),
                t.date,
                t.kind,
                t.payment_method,
                t.recurrence_type,
                t.installments,
                t.current_installment,
                t.category_id,
                t.bank_account_id,
                t.credit_card_id,
                t.voucher_credit,
                id,
            ],
        )?;
        self.get_transaction(id)
    }

    fn delete_transaction(&self, id: i64) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM transactions WHERE id=?1", params![id])?;
        if n == 0 {
            return Err(LedgerError::not_found("transaction", id));
        }
        Ok(())
    }

    fn get_account(&self, id: i64) -> Result<BankAccount> {
        self.conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE id=?1"),
                params![id],
                account_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("account", id))
    }

    fn update_account_balance(&self, id: i64, value: Decimal) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE bank_accounts SET current_balance=?1, updated_at=datetime('now') WHERE id=?2",
            params![value.to_string(), id],
        )?;
        if n == 0 {
            return Err(LedgerError::not_found("account", id));
        }
        Ok(())
    }

    fn get_card(&self, id: i64) -> Result<CreditCard> {
        self.conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM credit_cards WHERE id=?1"),
                params![id],
                card_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("card", id))
    }

    fn list_cards(&self, user_id: &str) -> Result<Vec<CreditCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM credit_cards WHERE user_id=?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![user_id], card_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn list_food_voucher_cards(&self, user_id: Option<&str>) -> Result<Vec<CreditCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM credit_cards
             WHERE card_type=?1 AND (?2 IS NULL OR user_id=?2)
             ORDER BY user_id, id"
        ))?;
        let rows = stmt.query_map(params![CardType::FoodVoucher, user_id], card_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_category(&self, id: i64) -> Result<Category> {
        self.conn
            .query_row(
                "SELECT id, name, color, icon, type, user_id FROM categories WHERE id=?1",
                params![id],
                category_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("category", id))
    }

    fn get_categories_by_type(
        &self,
        user_id: &str,
        kind: TransactionType,
    ) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, icon, type, user_id FROM categories
             WHERE user_id=?1 AND type=?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id, kind], category_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_budget(
        &self,
        user_id: &str,
        category_id: i64,
        month: u32,
        year: i32,
    ) -> Result<Option<Budget>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {BUDGET_COLUMNS} FROM budgets
                     WHERE user_id=?1 AND category_id=?2 AND month=?3 AND year=?4"
                ),
                params![user_id, category_id, month, year],
                budget_from_row,
            )
            .optional()?)
    }

    fn insert_budget(&self, b: &NewBudget) -> Result<Budget> {
        let res = self.conn.execute(
            "INSERT INTO budgets(category_id, amount, month, year, alert_threshold, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                b.category_id,
                b.amount.to_string(),
                b.month,
                b.year,
                b.alert_threshold,
                b.user_id
            ],
        );
        match res {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(LedgerError::DuplicateBudget {
                    category_id: b.category_id,
                    month: b.month,
                    year: b.year,
                });
            }
            Err(e) => return Err(e.into()),
        }
        self.get_budget(&b.user_id, b.category_id, b.month, b.year)?
            .ok_or_else(|| LedgerError::not_found("budget", self.conn.last_insert_rowid()))
    }

    fn upsert_budget(&self, b: &NewBudget) -> Result<Budget> {
        self.conn.execute(
            "INSERT INTO budgets(category_id, amount, month, year, alert_threshold, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, category_id, month, year)
             DO UPDATE SET amount=excluded.amount, alert_threshold=excluded.alert_threshold",
            params![
                b.category_id,
                b.amount.to_string(),
                b.month,
                b.year,
                b.alert_threshold,
                b.user_id
            ],
        )?;
        self.get_budget(&b.user_id, b.category_id, b.month, b.year)?
            .ok_or_else(|| LedgerError::not_found("budget", b.category_id))
    }
}
