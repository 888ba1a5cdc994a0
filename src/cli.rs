// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl")
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

fn month_arg() -> Arg {
    Arg::new("month")
        .long("month")
        .value_name("YYYY-MM")
        .help("Month to show (defaults to the current month)")
}

fn expense_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(Arg::new("date").long("date").value_name("YYYY-MM-DD").required(required))
        .arg(Arg::new("amount").long("amount").required(required).allow_hyphen_values(true))
        .arg(Arg::new("description").long("description").required(required))
        .arg(
            Arg::new("type")
                .long("type")
                .value_name("Income|Expense|Investment|Transfer")
                .required(required),
        )
        .arg(Arg::new("category").long("category"))
        .arg(Arg::new("source").long("source"))
}

pub fn build_cli() -> Command {
    Command::new("fintrack")
        .about("Personal finance dashboard client: expenses, budgets, CSV import, Splitwise reconciliation")
        .version(clap::crate_version!())
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .value_name("URL")
                .help("Backend base URL (overrides FINTRACK_API_URL and the stored setting)"),
        )
        .subcommand(
            Command::new("config")
                .about("Client settings")
                .subcommand(Command::new("show").about("Show effective settings"))
                .subcommand(
                    Command::new("set-api-url")
                        .about("Store the backend base URL")
                        .arg(Arg::new("url").required(true)),
                )
                .subcommand(
                    Command::new("set-splitwise-user")
                        .about("Store the Splitwise user the listing is fetched for")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .value_name("USER_ID")
                                .help("Splitwise user id, used to report your owed share"),
                        ),
                )
                .subcommand(
                    Command::new("theme").about("Set or toggle the table theme").arg(
                        Arg::new("mode")
                            .required(true)
                            .value_parser(["light", "dark", "toggle"]),
                    ),
                ),
        )
        .subcommand(
            Command::new("expense")
                .about("Expense and income records")
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List records")
                        .arg(month_arg().conflicts_with_all(["from", "to", "all"]))
                        .arg(Arg::new("from").long("from").value_name("YYYY-MM-DD").requires("to"))
                        .arg(Arg::new("to").long("to").value_name("YYYY-MM-DD").requires("from"))
                        .arg(
                            Arg::new("all")
                                .long("all")
                                .action(ArgAction::SetTrue)
                                .help("Every record, not just one month"),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ))
                .subcommand(expense_fields(Command::new("add").about("Add a record"), true))
                .subcommand(expense_fields(
                    Command::new("update")
                        .about("Update fields of a record")
                        .arg(Arg::new("id").required(true)),
                    false,
                ))
                .subcommand(
                    Command::new("delete")
                        .about("Delete a record")
                        .arg(Arg::new("id").required(true)),
                )
                .subcommand(
                    Command::new("export")
                        .about("Export records to a file")
                        .arg(month_arg())
                        .arg(Arg::new("out").long("out").required(true))
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .value_parser(["csv", "json"]),
                        ),
                )
                .subcommand(Command::new("categories").about("List categories")),
        )
        .subcommand(
            Command::new("budget")
                .about("Monthly budgets")
                .subcommand(
                    Command::new("set")
                        .about("Save the budget for a month")
                        .arg(month_arg().required(true))
                        .arg(Arg::new("overall").long("overall").required(true))
                        .arg(
                            Arg::new("category")
                                .long("category")
                                .value_name("NAME=AMOUNT")
                                .action(ArgAction::Append),
                        ),
                )
                .subcommand(json_flags(Command::new("show").about("Show the saved budget").arg(month_arg())))
                .subcommand(json_flags(
                    Command::new("track")
                        .about("Budget vs. actual spend")
                        .arg(month_arg()),
                ))
                .subcommand(Command::new("delete").about("Delete a month's budget").arg(month_arg().required(true))),
        )
        .subcommand(
            Command::new("import")
                .about("CSV import wizard")
                .subcommand(
                    Command::new("csv")
                        .about("Upload, map, preview and import a CSV file")
                        .arg(Arg::new("path").required(true))
                        .arg(
                            Arg::new("map")
                                .long("map")
                                .value_name("FIELD=COLUMN")
                                .action(ArgAction::Append)
                                .help("Override a column: field is date|amount|description|type|category|tags, column is a header name or index; empty column clears it"),
                        )
                        .arg(Arg::new("source").long("source").help("Data source label, e.g. 'Chequing'"))
                        .arg(
                            Arg::new("include-duplicates")
                                .long("include-duplicates")
                                .action(ArgAction::SetTrue)
                                .help("Do not skip rows flagged as duplicates"),
                        )
                        .arg(
                            Arg::new("rows")
                                .long("rows")
                                .value_name("I,J,...")
                                .value_delimiter(',')
                                .value_parser(value_parser!(usize))
                                .help("Import only these preview rows"),
                        )
                        .arg(
                            Arg::new("page-size")
                                .long("page-size")
                                .default_value("10")
                                .value_parser(value_parser!(usize)),
                        )
                        .arg(
                            Arg::new("dry-run")
                                .long("dry-run")
                                .action(ArgAction::SetTrue)
                                .help("Stop after the preview"),
                        )
                        .arg(
                            Arg::new("yes")
                                .long("yes")
                                .short('y')
                                .action(ArgAction::SetTrue)
                                .help("Do not offer to undo after importing"),
                        ),
                )
                .subcommand(
                    Command::new("rollback")
                        .about("Delete everything a previous import added")
                        .arg(Arg::new("import-id").required(true)),
                ),
        )
        .subcommand(
            Command::new("recon")
                .about("Reconcile bank transactions with Splitwise")
                .subcommand(json_flags(Command::new("list").about("Unreconciled transactions with candidate matches").arg(month_arg())))
                .subcommand(
                    Command::new("match")
                        .about("Mark transactions as matched with Splitwise")
                        .arg(Arg::new("id").required(true).num_args(1..))
                        .arg(month_arg()),
                )
                .subcommand(
                    Command::new("unmatch")
                        .about("Clear a transaction's match status")
                        .arg(Arg::new("id").required(true))
                        .arg(month_arg()),
                ),
        )
        .subcommand(
            Command::new("splitwise")
                .about("Splitwise synchronisation")
                .subcommand(Command::new("sync").about("Pull the latest Splitwise data into the backend"))
                .subcommand(Command::new("status").about("Show when Splitwise was last synced"))
                .subcommand(json_flags(
                    Command::new("list")
                        .about("Splitwise expenses for a month or date range")
                        .arg(month_arg().conflicts_with_all(["from", "to"]))
                        .arg(Arg::new("from").long("from").value_name("YYYY-MM-DD").requires("to"))
                        .arg(Arg::new("to").long("to").value_name("YYYY-MM-DD").requires("from"))
                        .arg(
                            Arg::new("user")
                                .long("user")
                                .help("Splitwise user name (defaults to the stored setting)"),
                        )
                        .arg(
                            Arg::new("user-id")
                                .long("user-id")
                                .help("Splitwise user id (defaults to the stored setting)"),
                        ),
                )),
        )
        .subcommand(json_flags(
            Command::new("dashboard")
                .about("Totals, trends and top categories")
                .arg(month_arg())
                .arg(
                    Arg::new("months-back")
                        .long("months-back")
                        .default_value("6")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("top")
                        .long("top")
                        .default_value("5")
                        .value_parser(value_parser!(usize)),
                ),
        ))
}
