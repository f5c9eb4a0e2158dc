// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{arg, value_parser, Command};

pub fn build_cli() -> Command {
    Command::new("hearthledger")
        .about("Household net-worth snapshots, monthly rollups, recurring schedules, and milestone alerts")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("job").about("Run engine jobs").subcommand(
                Command::new("run")
                    .about("Run snapshot, rollup, schedule and milestone jobs")
                    .arg(
                        arg!(--"type" <TYPE> "Job type: snapshot|rollup|schedules|milestones|all")
                            .required(false)
                            .default_value("all"),
                    )
                    .arg(arg!(--household <NAME> "Target a single household").required(false))
                    .arg(
                        arg!(--year <YEAR> "Rollup year (defaults to the previous month's)")
                            .required(false)
                            .value_parser(value_parser!(i32)),
                    )
                    .arg(
                        arg!(--month <MONTH> "Rollup month 1-12 (defaults to the previous month)")
                            .required(false)
                            .value_parser(value_parser!(u32)),
                    )
                    .arg(
                        arg!(--"as-of" <DATE> "Reference date YYYY-MM-DD (defaults to today)")
                            .required(false),
                    )
                    .arg(arg!(--scheduler "Mark this as a trusted scheduler run"))
                    .arg(arg!(--json "Print the run report as JSON"))
                    .arg(arg!(--jsonl "Print the run report as JSON lines")),
            ),
        )
        .subcommand(
            Command::new("schedule")
                .about("Inspect recurring schedules")
                .subcommand(
                    Command::new("list")
                        .about("List schedules and their next occurrences")
                        .arg(arg!(--household <NAME>).required(false))
                        .arg(arg!(--json))
                        .arg(arg!(--jsonl)),
                )
                .subcommand(
                    Command::new("preview")
                        .about("Project the next occurrences of one schedule")
                        .arg(arg!(--id <ID>).required(true).value_parser(value_parser!(i64)))
                        .arg(
                            arg!(--count <N> "How many occurrences to project")
                                .required(false)
                                .value_parser(value_parser!(usize))
                                .default_value("6"),
                        )
                        .arg(
                            arg!(--from <DATE> "Reference date (defaults to today)")
                                .required(false),
                        ),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("View derived records")
                .subcommand(
                    Command::new("snapshots")
                        .about("Net-worth snapshots")
                        .arg(arg!(--household <NAME>).required(false))
                        .arg(
                            arg!(--limit <N>)
                                .required(false)
                                .value_parser(value_parser!(usize))
                                .default_value("30"),
                        )
                        .arg(arg!(--json))
                        .arg(arg!(--jsonl)),
                )
                .subcommand(
                    Command::new("rollups")
                        .about("Monthly category rollups")
                        .arg(arg!(--household <NAME>).required(true))
                        .arg(arg!(--month <MONTH> "Month YYYY-MM").required(true))
                        .arg(arg!(--json))
                        .arg(arg!(--jsonl)),
                )
                .subcommand(
                    Command::new("notifications")
                        .about("Emitted notifications")
                        .arg(arg!(--household <NAME>).required(false))
                        .arg(arg!(--unread "Only unread notifications"))
                        .arg(
                            arg!(--limit <N>)
                                .required(false)
                                .value_parser(value_parser!(usize))
                                .default_value("50"),
                        )
                        .arg(arg!(--json))
                        .arg(arg!(--jsonl)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export derived records")
                .subcommand(
                    Command::new("snapshots")
                        .arg(arg!(--format <FMT> "csv|json").required(false).default_value("csv"))
                        .arg(arg!(--out <FILE>).required(true)),
                )
                .subcommand(
                    Command::new("rollups")
                        .arg(arg!(--format <FMT> "csv|json").required(false).default_value("csv"))
                        .arg(arg!(--out <FILE>).required(true)),
                ),
        )
        .subcommand(
            Command::new("price")
                .about("Cached unit prices for market-priced holdings")
                .subcommand(Command::new("fetch").about("Fetch latest quotes for held symbols"))
                .subcommand(Command::new("list").about("List cached prices")),
        )
        .subcommand(
            Command::new("fx")
                .about("Base currency and FX rates")
                .subcommand(
                    Command::new("set-base").arg(arg!(<currency> "Base currency code").required(true)),
                )
                .subcommand(
                    Command::new("fetch").arg(
                        arg!(--days <N> "History window in days")
                            .required(false)
                            .value_parser(value_parser!(usize))
                            .default_value("120"),
                    ),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(Command::new("doctor").about("Check the store for consistency issues"))
}
