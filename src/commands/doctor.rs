// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::balance::drifted_accounts;
use crate::commands::{load_config, resolve_user};
use crate::ledger::in_write_tx;
use crate::repository::{RecordRepository, SqliteRepository};
use crate::utils::{fmt_money, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    let user = resolve_user(&cfg, m);
    let fix = m.get_flag("fix");
    let mut rows = Vec::new();

    // 1) Cached balances that no longer match the transaction set
    let drifted = {
        let repo = SqliteRepository::new(conn);
        drifted_accounts(&repo, &repo.list_accounts(&user)?)?
    };
    for (a, actual) in &drifted {
        rows.push(vec![
            "balance_drift".into(),
            format!(
                "{}: cached {} vs {}",
                a.name,
                fmt_money(&a.current_balance),
                fmt_money(actual)
            ),
        ]);
    }
    if fix && !drifted.is_empty() {
        in_write_tx(conn, |repo| {
            for (a, _) in &drifted {
                crate::balance::recompute_bank_account_balance(repo, a.id)?;
            }
            Ok(())
        })?;
        rows.push(vec!["fixed".into(), format!("{} account(s)", drifted.len())]);
    }

    // 2) Linkage that breaks the payment method rules
    let mut stmt = conn.prepare(
        "SELECT id, payment_method, bank_account_id, credit_card_id FROM transactions
         WHERE user_id=?1 AND (
            (payment_method IN ('CREDIT','FOOD_VOUCHER') AND (credit_card_id IS NULL OR bank_account_id IS NOT NULL))
            OR (payment_method IN ('CASH','DEBIT') AND credit_card_id IS NOT NULL)
         ) ORDER BY id",
    )?;
    let mut cur = stmt.query([&user])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let method: String = r.get(1)?;
        rows.push(vec!["bad_linkage".into(), format!("transaction {} ({})", id, method)]);
    }

    // 3) Voucher cards with more than one reset marker in a month
    let repo = SqliteRepository::new(conn);
    for card in repo.list_food_voucher_cards(Some(&user))? {
        let mut stmt = conn.prepare(
            "SELECT substr(date,1,7) AS m, COUNT(*) FROM transactions
             WHERE credit_card_id=?1 AND type='INCOME' AND instr(description, 'Reset') > 0
             GROUP BY m HAVING COUNT(*) > 1",
        )?;
        let mut cur = stmt.query([card.id])?;
        while let Some(r) = cur.next()? {
            let month: String = r.get(0)?;
            let n: i64 = r.get(1)?;
            rows.push(vec![
                "duplicate_reset".into(),
                format!("{} {}: {} markers", card.name, month, n),
            ]);
        }
    }

    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
