// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::utils::{id_for_household, maybe_print_json, parse_month, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("snapshots", sub)) => snapshots(conn, sub)?,
        Some(("rollups", sub)) => rollups(conn, sub)?,
        Some(("notifications", sub)) => notifications(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn snapshot_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Vec<String>> {
    Ok(vec![
        r.get::<_, String>(0)?,
        r.get::<_, String>(1)?,
        r.get::<_, String>(2)?,
        r.get::<_, String>(3)?,
        r.get::<_, String>(4)?,
        r.get::<_, String>(5)?,
    ])
}

fn snapshots(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let limit = *sub.get_one::<usize>("limit").unwrap();

    let mut sql = String::from(
        "SELECT s.day, h.name, s.total_assets, s.total_liabilities, s.net_worth, s.currency
         FROM net_worth_snapshots s JOIN households h ON s.household_id=h.id",
    );
    let mut data = Vec::new();
    if let Some(household) = sub.get_one::<String>("household") {
        let hid = id_for_household(conn, household)?;
        sql.push_str(" WHERE s.household_id=?1 ORDER BY s.day DESC LIMIT ?2");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![hid, limit as i64], snapshot_row)?;
        for row in rows {
            data.push(row?);
        }
    } else {
        sql.push_str(" ORDER BY s.day DESC, h.name LIMIT ?1");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], snapshot_row)?;
        for row in rows {
            data.push(row?);
        }
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Day", "Household", "Assets", "Liabilities", "Net Worth", "CCY"],
                data
            )
        );
    }
    Ok(())
}

fn rollups(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let household = sub.get_one::<String>("household").unwrap();
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let hid = id_for_household(conn, household)?;

    let mut stmt = conn.prepare(
        "SELECT IFNULL(c.name, '(total)'), r.income, r.expense, r.transfers, r.txn_count,
                IFNULL(r.active_days,''), IFNULL(r.largest_txn,''), IFNULL(r.average_txn,'')
         FROM monthly_rollups r LEFT JOIN categories c ON r.category_id=c.id
         WHERE r.household_id=?1 AND r.month=?2
         ORDER BY r.category_id IS NOT NULL, c.name",
    )?;
    let rows = stmt.query_map(params![hid, month], |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, i64>(4)?.to_string(),
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
        ])
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Category", "Income", "Expense", "Transfers", "Count", "Days", "Largest", "Average"],
                data
            )
        );
    }
    Ok(())
}

fn notifications(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let unread_only = sub.get_flag("unread");
    let limit = *sub.get_one::<usize>("limit").unwrap();

    let mut sql = String::from(
        "SELECT n.created_at, u.name, n.kind, n.priority, n.title, n.is_read
         FROM notifications n JOIN users u ON n.user_id=u.id",
    );
    let mut clauses = Vec::new();
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(household) = sub.get_one::<String>("household") {
        let hid = id_for_household(conn, household)?;
        clauses.push("u.household_id=?".to_string());
        params_vec.push(hid.to_string());
    }
    if unread_only {
        clauses.push("n.is_read=0".to_string());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY n.created_at DESC, n.id DESC LIMIT ?");
    params_vec.push(limit.to_string());

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            if r.get::<_, bool>(5)? { "read".into() } else { "unread".into() },
        ])
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Created", "User", "Kind", "Priority", "Title", "Read"],
                data
            )
        );
    }
    Ok(())
}
