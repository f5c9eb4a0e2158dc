// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::engine::runner::{parse_job_types, run, RunRequest, Trigger};
use crate::utils::{maybe_print_json, parse_date, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("run", sub)) => run_jobs(conn, sub),
        _ => Ok(()),
    }
}

fn run_jobs(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let jobs = parse_job_types(sub.get_one::<String>("type").unwrap())?;
    let household = sub.get_one::<String>("household").map(|s| s.to_string());
    let year = sub.get_one::<i32>("year").copied();
    let month = sub.get_one::<u32>("month").copied();
    let year_month = match (year, month) {
        (Some(y), Some(m)) => Some((y, m)),
        (None, None) => None,
        _ => anyhow::bail!("--year and --month must be given together"),
    };
    let as_of = match sub.get_one::<String>("as-of") {
        Some(s) => parse_date(s)?,
        None => chrono::Utc::now().date_naive(),
    };
    let trigger = if sub.get_flag("scheduler") {
        Trigger::Scheduler
    } else {
        Trigger::Manual
    };

    let report = run(
        conn,
        &RunRequest {
            jobs,
            household,
            year_month,
            as_of,
            trigger,
        },
    )?;

    if !maybe_print_json(json_flag, jsonl_flag, &report)? {
        let mut data = Vec::new();
        for hr in &report.households {
            data.push(vec![
                hr.household.clone(),
                hr.snapshot
                    .as_ref()
                    .map(|s| format!("{:.2}", s.net_worth))
                    .unwrap_or_default(),
                hr.rollup_rows.map(|n| n.to_string()).unwrap_or_default(),
                hr.schedules_advanced
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
                hr.notifications_emitted
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
                hr.error.clone().unwrap_or_default(),
            ]);
        }
        println!(
            "{}",
            pretty_table(
                &["Household", "Net Worth", "Rollup Rows", "Advanced", "Notified", "Error"],
                data
            )
        );
        println!(
            "{} processed, {} failed (as of {}, rollup month {})",
            report.processed, report.failed, report.as_of, report.rollup_month
        );
        for hr in &report.households {
            for w in &hr.warnings {
                println!("warning [{}]: {}", hr.household, w);
            }
        }
    }
    Ok(())
}
