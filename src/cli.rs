// Copyright (c) AlphaVelocity.
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
            .help("Print output as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print output as JSON lines"),
    )
}

fn trade_entry_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("date").long("date").value_name("DATE").required(true))
        .arg(Arg::new("isin").long("isin").value_name("ISIN").required(true))
        .arg(
            Arg::new("quantity")
                .long("quantity")
                .value_name("QTY")
                .required(true)
                .help("Share count, up to 5 decimal places"),
        )
        .arg(Arg::new("price").long("price").value_name("PRICE").required(true))
        .arg(Arg::new("name").long("name").value_name("NAME"))
        .arg(Arg::new("symbol").long("symbol").value_name("SYMBOL"))
        .arg(Arg::new("exchange").long("exchange").value_name("MIC"))
        .arg(
            Arg::new("total")
                .long("total")
                .value_name("TOTAL")
                .help("Cash total; defaults to price x quantity (negated for a sell)"),
        )
}

pub fn build_cli() -> Command {
    Command::new("capgains")
        .about("Securities trade ledger with FIFO lot reconciliation and capital gains reporting")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .global(true)
                .help("Path to the SQLite database (defaults to the platform data dir)"),
        )
        .subcommand(Command::new("init").about("Create the database and schema"))
        .subcommand(
            Command::new("trade")
                .about("Record and list trades")
                .subcommand(trade_entry_args(
                    Command::new("buy").about("Record a purchase"),
                ))
                .subcommand(trade_entry_args(
                    Command::new("sell").about("Record a sale"),
                ))
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List trades, newest first")
                        .arg(Arg::new("isin").long("isin").value_name("ISIN"))
                        .arg(
                            Arg::new("side")
                                .long("side")
                                .value_name("SIDE")
                                .help("Buy or Sell"),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_name("N")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("movement")
                .about("Record and list cash movements")
                .subcommand(
                    Command::new("add")
                        .about("Record a cash movement")
                        .arg(Arg::new("date").long("date").value_name("DATE").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .value_name("KIND")
                                .required(true)
                                .help("Dividends, Invoice, Funding or Divestment"),
                        )
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .value_name("AMOUNT")
                                .required(true),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List movements, newest first")
                        .arg(Arg::new("kind").long("kind").value_name("KIND"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_name("N")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("import")
                .about("Bulk-load CSV exports into the ledger")
                .subcommand(
                    Command::new("trades")
                        .about("Import a trade history CSV")
                        .arg(Arg::new("path").value_name("PATH").required(true)),
                )
                .subcommand(
                    Command::new("movements")
                        .about("Import a cash movement history CSV")
                        .arg(Arg::new("path").value_name("PATH").required(true)),
                ),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Match unreconciled sales against purchases on a FIFO cost basis"),
        )
        .subcommand(
            Command::new("report")
                .about("Capital gains and dividend reporting")
                .subcommand(json_flags(
                    Command::new("year")
                        .about("Report dividends and realized gains for one tax year")
                        .arg(Arg::new("year").value_name("YEAR").required(true)),
                ))
                .subcommand(
                    Command::new("all")
                        .about("Report every year covered by the trade ledger"),
                ),
        )
        .subcommand(Command::new("doctor").about("Check ledger and match-record integrity"))
}
