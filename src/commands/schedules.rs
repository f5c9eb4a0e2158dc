// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::engine::recurrence::next_occurrence;
use crate::engine::schedules::load_active;
use crate::utils::{id_for_household, maybe_print_json, parse_date, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("preview", sub)) => preview(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn schedule_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Vec<String>> {
    Ok(vec![
        r.get::<_, i64>(0)?.to_string(),
        r.get::<_, String>(1)?,
        r.get::<_, String>(2)?,
        r.get::<_, String>(3)?,
        r.get::<_, String>(4)?,
        r.get::<_, String>(5)?,
        r.get::<_, String>(6)?,
        r.get::<_, String>(7)?,
        r.get::<_, i64>(8)?.to_string(),
    ])
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut sql = String::from(
        "SELECT s.id, h.name, s.description, s.amount, s.currency, s.frequency,
                IFNULL(s.next_occurrence,''), IFNULL(s.last_occurrence,''), s.occurrence_count
         FROM recurring_schedules s JOIN households h ON s.household_id=h.id
         WHERE s.is_active=1",
    );
    let mut data = Vec::new();
    if let Some(household) = sub.get_one::<String>("household") {
        let hid = id_for_household(conn, household)?;
        sql.push_str(" AND s.household_id=?1 ORDER BY s.id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![hid], schedule_row)?;
        for row in rows {
            data.push(row?);
        }
    } else {
        sql.push_str(" ORDER BY h.name, s.id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], schedule_row)?;
        for row in rows {
            data.push(row?);
        }
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Id", "Household", "Description", "Amount", "CCY", "Frequency", "Next", "Last", "Count"],
                data
            )
        );
    }
    Ok(())
}

/// Read-only projection of upcoming occurrences through the calculator.
fn preview(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let count = *sub.get_one::<usize>("count").unwrap();
    let from = match sub.get_one::<String>("from") {
        Some(s) => parse_date(s)?,
        None => chrono::Utc::now().date_naive(),
    };

    let household_id: i64 = conn
        .query_row(
            "SELECT household_id FROM recurring_schedules WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .with_context(|| format!("Schedule {} not found", id))?;
    let schedule = load_active(conn, household_id)?
        .into_iter()
        .find(|s| s.id == id)
        .with_context(|| format!("Schedule {} is not active", id))?;

    let mut data = Vec::new();
    let mut cursor = from;
    for _ in 0..count {
        cursor = next_occurrence(&schedule.rule, cursor)?;
        if let Some(ends_on) = schedule.rule.ends_on {
            if cursor > ends_on {
                break;
            }
        }
        data.push(vec![cursor.to_string()]);
    }
    let header = format!("'{}' occurs on", schedule.description);
    println!("{}", pretty_table(&[header.as_str()], data));
    Ok(())
}
