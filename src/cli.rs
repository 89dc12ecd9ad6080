// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, command, value_parser};

fn json_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    )
}

fn window_arg() -> Arg {
    Arg::new("window")
        .long("window")
        .value_parser(["all", "month", "cycle"])
        .help("Billing window for the available limit (defaults to the limit_window setting)")
}

fn tx_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(Arg::new("description").long("description").required(required))
        .arg(
            Arg::new("amount")
                .long("amount")
                .required(required)
                .allow_hyphen_values(true),
        )
        .arg(Arg::new("date").long("date").help("YYYY-MM-DD, defaults to today"))
        .arg(
            Arg::new("type")
                .long("type")
                .value_parser(["income", "expense"])
                .required(required),
        )
        .arg(Arg::new("category").long("category").required(required))
        .arg(
            Arg::new("method")
                .long("method")
                .value_parser(["cash", "debit", "credit", "food-voucher"]),
        )
        .arg(
            Arg::new("recurrence")
                .long("recurrence")
                .value_parser(["single", "installment", "recurring"]),
        )
        .arg(
            Arg::new("installments")
                .long("installments")
                .value_parser(value_parser!(u32)),
        )
        .arg(Arg::new("account").long("account"))
        .arg(Arg::new("card").long("card"))
        .arg(
            Arg::new("voucher_credit")
                .long("voucher-credit")
                .action(ArgAction::SetTrue)
                .help("Mark an income as a food voucher credit"),
        )
}

pub fn build_cli() -> Command {
    command!()
        .name("cofre")
        .about("Personal finance ledger with balance, card limit and food voucher reconciliation")
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .help("Act as this user (defaults to the default_user setting)"),
        )
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("config")
                .about("Read or change settings")
                .subcommand(Command::new("get").arg(Arg::new("key").long("key")))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").long("key").required(true))
                        .arg(Arg::new("value").long("value").required(true)),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Bank accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("initial")
                                .long("initial")
                                .default_value("0")
                                .allow_hyphen_values(true),
                        ),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true)))
                .subcommand(
                    Command::new("recompute")
                        .about("Rebuild the cached balance from transactions")
                        .arg(Arg::new("name").long("name")),
                ),
        )
        .subcommand(
            Command::new("card")
                .about("Credit, debit and food voucher cards")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("limit").long("limit").required(true))
                        .arg(
                            Arg::new("due_day")
                                .long("due-day")
                                .value_parser(value_parser!(u32).range(1..=31))
                                .default_value("10"),
                        )
                        .arg(
                            Arg::new("closing_day")
                                .long("closing-day")
                                .value_parser(value_parser!(u32).range(1..=31))
                                .default_value("1"),
                        )
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["credit", "debit", "food-voucher"])
                                .default_value("credit"),
                        ),
                )
                .subcommand(json_args(Command::new("list")).arg(window_arg()))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true)))
                .subcommand(
                    json_args(Command::new("limit"))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(window_arg()),
                )
                .subcommand(
                    Command::new("adjust")
                        .about("Book an adjustment so the available limit equals the target")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("available").long("available").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["income", "expense"])
                                .default_value("expense"),
                        )
                        .arg(Arg::new("color").long("color"))
                        .arg(Arg::new("icon").long("icon")),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("tx")
                .about("Transactions")
                .subcommand(tx_fields(Command::new("add"), true))
                .subcommand(
                    tx_fields(Command::new("edit"), false)
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("no_account")
                                .long("no-account")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("account"),
                        )
                        .arg(
                            Arg::new("no_card")
                                .long("no-card")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("card"),
                        ),
                )
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(
                    json_args(Command::new("list"))
                        .arg(Arg::new("month").long("month"))
                        .arg(Arg::new("from").long("from"))
                        .arg(Arg::new("to").long("to"))
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("card").long("card"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("search").long("search"))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["income", "expense"]),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ),
        )
        .subcommand(
            json_args(Command::new("summary"))
                .about("Monthly income, expense and food voucher totals")
                .arg(
                    Arg::new("months")
                        .long("months")
                        .value_parser(value_parser!(usize))
                        .default_value("12"),
                )
                .arg(Arg::new("month").long("month")),
        )
        .subcommand(
            Command::new("budget")
                .about("Category budgets")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("threshold")
                                .long("threshold")
                                .value_parser(value_parser!(u32))
                                .default_value("80"),
                        ),
                )
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("threshold")
                                .long("threshold")
                                .value_parser(value_parser!(u32))
                                .default_value("80"),
                        ),
                )
                .subcommand(json_args(Command::new("list")).arg(Arg::new("month").long("month")))
                .subcommand(
                    json_args(Command::new("status"))
                        .arg(Arg::new("month").long("month").required(true)),
                ),
        )
        .subcommand(
            Command::new("goal")
                .about("Savings goals")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("target").long("target").required(true))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(
                    Command::new("contribute")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("op")
                                .long("op")
                                .value_parser(["add", "subtract", "set"])
                                .default_value("add"),
                        )
                        .arg(Arg::new("amount").long("amount").required(true)),
                ),
        )
        .subcommand(
            Command::new("voucher")
                .about("Food voucher maintenance")
                .subcommand(
                    json_args(Command::new("reset"))
                        .arg(Arg::new("token").long("token").help("Scheduler shared secret"))
                        .arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
                        .arg(
                            Arg::new("first_day")
                                .long("first-day")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(Arg::new("manual").long("manual").action(ArgAction::SetTrue))
                        .arg(
                            Arg::new("all_users")
                                .long("all-users")
                                .action(ArgAction::SetTrue)
                                .help("Reset every user's cards (scheduler only)"),
                        )
                        .arg(Arg::new("date").long("date").help("Override today's date")),
                ),
        )
        .subcommand(
            Command::new("doctor")
                .about("Check cached balances and transaction linkage")
                .arg(
                    Arg::new("fix")
                        .long("fix")
                        .action(ArgAction::SetTrue)
                        .help("Rewrite drifted balances"),
                ),
        )
}
