// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{load_config, resolve_user, today};
use crate::config::LedgerConfig;
use crate::ledger::{self, Ledger, MutationOutcome};
use crate::models::{
    Category, NewTransaction, PaymentMethod, RecurrenceType, TransactionPatch, TransactionType,
};
use crate::repository::{RecordRepository, SqliteRepository, TransactionFilter};
use crate::utils::{
    first_day_of_month, fmt_money, last_day_of_month, maybe_print_json, parse_date,
    parse_decimal, parse_month, pretty_table,
};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let cfg = load_config(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => add(conn, &cfg, sub)?,
        Some(("edit", sub)) => edit(conn, &cfg, sub)?,
        Some(("rm", sub)) => {
            let user = resolve_user(&cfg, sub);
            let id = *sub.get_one::<i64>("id").unwrap();
            let ledger = Ledger::from_config(&cfg, today())?;
            let outcome = ledger::delete_transaction(conn, &ledger, &user, id)?;
            println!("Removed transaction {}", id);
            print_reconciled(&outcome);
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn category_for(
    repo: &SqliteRepository<'_>,
    user: &str,
    name: &str,
    kind: Option<TransactionType>,
) -> Result<Category> {
    let cats = repo.list_categories(user)?;
    let found = cats
        .iter()
        .find(|c| c.name == name && kind.is_none_or(|k| c.kind == k))
        .or_else(|| cats.iter().find(|c| c.name == name))
        .cloned();
    found.ok_or_else(|| anyhow!("Category '{}' not found", name))
}

fn opt_str<'a>(sub: &'a clap::ArgMatches, id: &str) -> Option<&'a str> {
    sub.get_one::<String>(id)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn add(conn: &mut Connection, cfg: &LedgerConfig, sub: &clap::ArgMatches) -> Result<()> {
    let user = resolve_user(cfg, sub);
    let description = sub.get_one::<String>("description").unwrap().trim().to_string();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let date = match opt_str(sub, "date") {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let kind: TransactionType = sub.get_one::<String>("type").unwrap().parse()?;

    let repo = SqliteRepository::new(conn);
    let category = category_for(&repo, &user, sub.get_one::<String>("category").unwrap().trim(), Some(kind))?;
    let bank_account_id = match opt_str(sub, "account") {
        Some(n) => Some(repo.account_by_name(&user, n)?.id),
        None => None,
    };
    let credit_card_id = match opt_str(sub, "card") {
        Some(n) => Some(repo.card_by_name(&user, n)?.id),
        None => None,
    };
    let payment_method = match opt_str(sub, "method") {
        Some(p) => p.parse()?,
        None if credit_card_id.is_some() => PaymentMethod::Credit,
        None if bank_account_id.is_some() => PaymentMethod::Debit,
        None => PaymentMethod::Cash,
    };
    let recurrence_type: RecurrenceType = match opt_str(sub, "recurrence") {
        Some(r) => r.parse()?,
        None => RecurrenceType::Single,
    };

    let input = NewTransaction {
        user_id: user,
        description,
        amount,
        date,
        kind,
        payment_method,
        recurrence_type,
        installments: sub.get_one::<u32>("installments").copied(),
        current_installment: None,
        category_id: category.id,
        bank_account_id,
        credit_card_id,
        voucher_credit: sub.get_flag("voucher_credit"),
    };
    let ledger = Ledger::from_config(cfg, today())?;
    let outcome = ledger::create_transaction(conn, &ledger, &input)?;
    for t in &outcome.transactions {
        println!(
            "Recorded {} {} on {} '{}' (id {})",
            t.kind,
            fmt_money(&t.amount.abs()),
            t.date,
            t.description,
            t.id
        );
    }
    print_reconciled(&outcome);
    Ok(())
}

fn edit(conn: &mut Connection, cfg: &LedgerConfig, sub: &clap::ArgMatches) -> Result<()> {
    let user = resolve_user(cfg, sub);
    let id = *sub.get_one::<i64>("id").unwrap();
    let repo = SqliteRepository::new(conn);

    let mut patch = TransactionPatch {
        description: opt_str(sub, "description").map(|s| s.to_string()),
        ..Default::default()
    };
    if let Some(a) = opt_str(sub, "amount") {
        patch.amount = Some(parse_decimal(a)?);
    }
    if let Some(d) = opt_str(sub, "date") {
        patch.date = Some(parse_date(d)?);
    }
    if let Some(k) = opt_str(sub, "type") {
        patch.kind = Some(k.parse()?);
    }
    if let Some(p) = opt_str(sub, "method") {
        patch.payment_method = Some(p.parse()?);
    }
    if let Some(r) = opt_str(sub, "recurrence") {
        patch.recurrence_type = Some(r.parse()?);
    }
    if let Some(n) = sub.get_one::<u32>("installments") {
        patch.installments = Some(Some(*n));
    }
    if let Some(c) = opt_str(sub, "category") {
        patch.category_id = Some(category_for(&repo, &user, c, patch.kind)?.id);
    }
    if let Some(a) = opt_str(sub, "account") {
        patch.bank_account_id = Some(Some(repo.account_by_name(&user, a)?.id));
    } else if sub.get_flag("no_account") {
        patch.bank_account_id = Some(None);
    }
    if let Some(c) = opt_str(sub, "card") {
        patch.credit_card_id = Some(Some(repo.card_by_name(&user, c)?.id));
    } else if sub.get_flag("no_card") {
        patch.credit_card_id = Some(None);
    }
    if sub.get_flag("voucher_credit") {
        patch.voucher_credit = Some(true);
    }

    let ledger = Ledger::from_config(cfg, today())?;
    let outcome = ledger::update_transaction(conn, &ledger, &user, id, &patch)?;
    info!(id, "edited transaction");
    println!("Updated transaction {}", id);
    print_reconciled(&outcome);
    Ok(())
}

fn print_reconciled(outcome: &MutationOutcome) {
    for a in &outcome.reconciled.accounts {
        println!("  account {} balance {}", a.account_id, fmt_money(&a.balance));
    }
    for c in &outcome.reconciled.cards {
        println!(
            "  card '{}' available {} of {}",
            c.card_name,
            fmt_money(&c.available),
            fmt_money(&c.limit)
        );
    }
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.to_string(),
                    r.description.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.method.clone(),
                    r.category.clone(),
                    r.source.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Description", "Type", "Amount", "Method", "Category", "Account/Card"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub kind: String,
    /// Signed, two decimals.
    pub amount: String,
    pub method: String,
    pub recurrence: String,
    pub category: String,
    pub source: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let cfg = load_config(conn)?;
    let user = resolve_user(&cfg, sub);
    let repo = SqliteRepository::new(conn);

    let mut filter = TransactionFilter::for_user(&user);
    if let Some(month) = opt_str(sub, "month") {
        let (y, m) = parse_month(month)?;
        let first = NaiveDate::from_ymd_opt(y, m, 1).ok_or_else(|| anyhow!("Invalid month"))?;
        filter = filter.between(first_day_of_month(first), last_day_of_month(first));
    }
    if let Some(from) = opt_str(sub, "from") {
        filter.from = Some(parse_date(from)?);
    }
    if let Some(to) = opt_str(sub, "to") {
        filter.to = Some(parse_date(to)?);
    }
    if let Some(a) = opt_str(sub, "account") {
        filter.bank_account_id = Some(repo.account_by_name(&user, a)?.id);
    }
    if let Some(c) = opt_str(sub, "card") {
        filter.credit_card_id = Some(repo.card_by_name(&user, c)?.id);
    }
    if let Some(c) = opt_str(sub, "category") {
        filter.category_id = Some(category_for(&repo, &user, c, None)?.id);
    }
    if let Some(k) = opt_str(sub, "type") {
        filter.kind = Some(k.parse()?);
    }
    filter.description = opt_str(sub, "search").map(|s| s.to_string());
    filter.limit = sub.get_one::<usize>("limit").copied();

    let categories = repo.list_categories(&user)?;
    let accounts = repo.list_accounts(&user)?;
    let cards = repo.list_cards(&user)?;
    let mut data = Vec::new();
    for t in repo.find_transactions(&filter)? {
        let category = categories
            .iter()
            .find(|c| c.id == t.category_id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let source = match (t.bank_account_id, t.credit_card_id) {
            (Some(a), _) => accounts
                .iter()
                .find(|x| x.id == a)
                .map(|x| x.name.clone())
                .unwrap_or_default(),
            (None, Some(c)) => cards
                .iter()
                .find(|x| x.id == c)
                .map(|x| x.name.clone())
                .unwrap_or_default(),
            (None, None) => String::new(),
        };
        let recurrence = match (t.recurrence_type, t.current_installment, t.installments) {
            (RecurrenceType::Installment, Some(c), Some(n)) => format!("{}/{}", c, n),
            (r, _, _) => r.to_string(),
        };
        data.push(TransactionRow {
            id: t.id,
            date: t.date,
            description: t.description,
            kind: t.kind.to_string(),
            amount: fmt_money(&t.amount),
            method: t.payment_method.to_string(),
            recurrence,
            category,
            source,
        });
    }
    Ok(data)
}
