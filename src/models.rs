// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Text-backed enums stored as their upper-case names.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(LedgerError::validation(format!(
                        "invalid {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

text_enum!(TransactionType { Income => "INCOME", Expense => "EXPENSE" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Debit,
    Credit,
    FoodVoucher,
}

text_enum!(PaymentMethod {
    Cash => "CASH",
    Debit => "DEBIT",
    Credit => "CREDIT",
    FoodVoucher => "FOOD_VOUCHER",
});

impl PaymentMethod {
    /// CREDIT and FOOD_VOUCHER spend against a card; the rest move bank money.
    pub fn uses_card(&self) -> bool {
        matches!(self, PaymentMethod::Credit | PaymentMethod::FoodVoucher)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceType {
    Single,
    Installment,
    Recurring,
}

text_enum!(RecurrenceType {
    Single => "SINGLE",
    Installment => "INSTALLMENT",
    Recurring => "RECURRING",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
    Credit,
    Debit,
    FoodVoucher,
}

text_enum!(CardType {
    Credit => "CREDIT",
    Debit => "DEBIT",
    FoodVoucher => "FOOD_VOUCHER",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub payment_method: PaymentMethod,
    pub recurrence_type: RecurrenceType,
    pub installments: Option<u32>,
    pub current_installment: Option<u32>,
    pub category_id: i64,
    pub bank_account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    pub voucher_credit: bool,
    pub user_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// Returns a copy with every field present in `patch` overwritten.
    pub fn with_patch(&self, patch: &TransactionPatch) -> Transaction {
        let mut t = self.clone();
        if let Some(d) = &patch.description {
            t.description = d.clone();
        }
        if let Some(a) = patch.amount {
            t.amount = a;
        }
        if let Some(d) = patch.date {
            t.date = d;
        }
        if let Some(k) = patch.kind {
            t.kind = k;
        }
        if let Some(p) = patch.payment_method {
            t.payment_method = p;
        }
        if let Some(r) = patch.recurrence_type {
            t.recurrence_type = r;
        }
        if let Some(n) = patch.installments {
            t.installments = n;
        }
        if let Some(n) = patch.current_installment {
            t.current_installment = n;
        }
        if let Some(c) = patch.category_id {
            t.category_id = c;
        }
        if let Some(a) = patch.bank_account_id {
            t.bank_account_id = a;
        }
        if let Some(c) = patch.credit_card_id {
            t.credit_card_id = c;
        }
        if let Some(v) = patch.voucher_credit {
            t.voucher_credit = v;
        }
        t
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub user_id: String,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub payment_method: PaymentMethod,
    pub recurrence_type: RecurrenceType,
    pub installments: Option<u32>,
    pub current_installment: Option<u32>,
    pub category_id: i64,
    pub bank_account_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    #[serde(default)]
    pub voucher_credit: bool,
}

impl NewTransaction {
    /// A single cash movement; callers adjust the remaining fields in place.
    pub fn simple(
        user_id: &str,
        description: &str,
        amount: Decimal,
        date: NaiveDate,
        kind: TransactionType,
        category_id: i64,
    ) -> Self {
        NewTransaction {
            user_id: user_id.to_string(),
            description: description.to_string(),
            amount,
            date,
            kind,
            payment_method: PaymentMethod::Cash,
            recurrence_type: RecurrenceType::Single,
            installments: None,
            current_installment: None,
            category_id,
            bank_account_id: None,
            credit_card_id: None,
            voucher_credit: false,
        }
    }
}

/// Partial update. Nullable columns use a nested `Option` so that
/// `Some(None)` clears the column while `None` leaves it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub payment_method: Option<PaymentMethod>,
    pub recurrence_type: Option<RecurrenceType>,
    pub installments: Option<Option<u32>>,
    pub current_installment: Option<Option<u32>>,
    pub category_id: Option<i64>,
    pub bank_account_id: Option<Option<i64>>,
    pub credit_card_id: Option<Option<i64>>,
    pub voucher_credit: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: i64,
    pub name: String,
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub user_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCard {
    pub id: i64,
    pub name: String,
    pub limit: Decimal,
    pub due_day: u32,
    pub closing_day: u32,
    pub card_type: CardType,
    pub user_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CreditCard {
    pub fn is_food_voucher(&self) -> bool {
        self.card_type == CardType::FoodVoucher
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
    pub alert_threshold: u32,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    pub user_id: String,
    pub category_id: i64,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
    pub alert_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialGoal {
    pub id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: Option<NaiveDate>,
    pub user_id: String,
}

impl FinancialGoal {
    pub fn completed(&self) -> bool {
        self.current_amount >= self.target_amount
    }
}
