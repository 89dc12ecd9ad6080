// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Errors raised by the reconciliation core.
//!
//! Command handlers wrap these in `anyhow` with extra context; library
//! callers can match on the variants to tell a missing record apart from a
//! duplicate budget or a failed recomputation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("a budget already exists for category {category_id} in {year}-{month:02}")]
    DuplicateBudget {
        category_id: i64,
        month: u32,
        year: i32,
    },
    #[error("reconciliation of {target} failed: {reason}")]
    Reconciliation { target: String, reason: String },
    #[error("scheduler token rejected")]
    Unauthorized,
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }
}
