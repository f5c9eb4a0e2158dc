// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("snapshots", sub)) => export_snapshots(conn, sub),
        Some(("rollups", sub)) => export_rollups(conn, sub),
        _ => Ok(()),
    }
}

fn export_snapshots(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT h.name, s.day, s.total_assets, s.total_liabilities, s.net_worth, s.currency
         FROM net_worth_snapshots s JOIN households h ON s.household_id=h.id
         ORDER BY h.name, s.day",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "household", "day", "total_assets", "total_liabilities", "net_worth", "currency",
            ])?;
            for row in rows {
                let (h, d, a, l, n, c) = row?;
                wtr.write_record([h, d, a, l, n, c])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (h, d, a, l, n, c) = row?;
                items.push(json!({
                    "household": h, "day": d, "total_assets": a,
                    "total_liabilities": l, "net_worth": n, "currency": c
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported snapshots to {}", out);
    Ok(())
}

fn export_rollups(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT h.name, r.month, IFNULL(c.name, ''), r.income, r.expense, r.transfers, r.txn_count
         FROM monthly_rollups r
         JOIN households h ON r.household_id=h.id
         LEFT JOIN categories c ON r.category_id=c.id
         ORDER BY h.name, r.month, r.category_id IS NOT NULL, c.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "household", "month", "category", "income", "expense", "transfers", "txn_count",
            ])?;
            for row in rows {
                let (h, m, cat, i, e, t, n) = row?;
                wtr.write_record([h, m, cat, i, e, t, n.to_string()])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (h, m, cat, i, e, t, n) = row?;
                items.push(json!({
                    "household": h, "month": m, "category": cat,
                    "income": i, "expense": e, "transfers": t, "txn_count": n
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported rollups to {}", out);
    Ok(())
}
