// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();
    let today = chrono::Utc::now().date_naive().to_string();

    // 1) Held symbols with no cached price
    let mut stmt = conn.prepare(
        "SELECT DISTINCT symbol FROM holdings EXCEPT SELECT symbol FROM prices",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let s: String = r.get(0)?;
        rows.push(vec!["missing_price".into(), s]);
    }

    // 2) FX coverage gaps: non-base transaction currencies lacking a rate on or before date
    let base = crate::utils::get_base_currency(conn)?;
    let mut stmt2 = conn.prepare(
        "SELECT DISTINCT date, currency FROM transactions WHERE currency != ?1 ORDER BY date",
    )?;
    let mut cur2 = stmt2.query([&base])?;
    while let Some(r) = cur2.next()? {
        let d: String = r.get(0)?;
        let ccy: String = r.get(1)?;
        let mut st = conn.prepare_cached(
            "SELECT 1 FROM fx_rates WHERE ((base=?1 AND quote=?2) OR (base=?2 AND quote=?1)) AND date<=?3 LIMIT 1",
        )?;
        let ok: Option<i32> = st.query_row((&base, &ccy, &d), |r| r.get(0)).optional()?;
        if ok.is_none() {
            rows.push(vec!["missing_fx".into(), format!("{} {}", d, ccy)]);
        }
    }

    // 3) Active schedules that the advancer has fallen behind on
    let mut stmt3 = conn.prepare(
        "SELECT description, next_occurrence FROM recurring_schedules
         WHERE is_active=1 AND next_occurrence IS NOT NULL AND next_occurrence < ?1",
    )?;
    let mut cur3 = stmt3.query([&today])?;
    while let Some(r) = cur3.next()? {
        let desc: String = r.get(0)?;
        let next: String = r.get(1)?;
        rows.push(vec!["stale_schedule".into(), format!("{} (due {})", desc, next)]);
    }

    // 4) Schedules whose window is inverted
    let mut stmt4 = conn.prepare(
        "SELECT description FROM recurring_schedules WHERE ends_on IS NOT NULL AND ends_on < starts_on",
    )?;
    let mut cur4 = stmt4.query([])?;
    while let Some(r) = cur4.next()? {
        let desc: String = r.get(0)?;
        rows.push(vec!["inverted_schedule_window".into(), desc]);
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
