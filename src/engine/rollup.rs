// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

use crate::models::MonthlyRollup;
use crate::utils::{fx_convert, get_base_currency, month_bounds, month_key, parse_date};

#[derive(Debug, Default, Clone)]
struct Bucket {
    income: Decimal,
    expense: Decimal,
    transfers: Decimal,
    count: i64,
}

impl Bucket {
    fn add(&mut self, kind: &str, amount: Decimal) {
        match kind {
            "income" => self.income += amount,
            "expense" => self.expense += amount,
            _ => self.transfers += amount,
        }
        self.count += 1;
    }
}

/// Rebuild the (household, month) aggregate rows from cleared ledger
/// transactions. The prior row set is replaced inside one storage transaction
/// (delete then insert), so reruns are idempotent and categories that lost all
/// their transactions disappear instead of lingering.
pub fn build_rollup(
    conn: &mut Connection,
    household_id: i64,
    year: i32,
    month: u32,
) -> Result<Vec<MonthlyRollup>> {
    let key = month_key(year, month);
    let (first, next_first) = month_bounds(&key)?;
    let base = get_base_currency(conn)?;

    let mut stmt = conn.prepare(
        "SELECT date, amount, kind, category_id, currency FROM transactions
         WHERE household_id=?1 AND status='cleared' AND date>=?2 AND date<?3
         ORDER BY date, id",
    )?;
    let rows = stmt.query_map(
        params![household_id, first.to_string(), next_first.to_string()],
        |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<i64>>(3)?,
                r.get::<_, String>(4)?,
            ))
        },
    )?;

    let mut total = Bucket::default();
    let mut by_category: BTreeMap<i64, Bucket> = BTreeMap::new();
    let mut active_days = HashSet::new();
    let mut largest = Decimal::ZERO;
    let mut magnitude_sum = Decimal::ZERO;

    for row in rows {
        let (date_s, amount_s, kind, category_id, currency) = row?;
        let date = parse_date(&date_s)?;
        let amount = amount_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' on {}", amount_s, date_s))?;
        // sums are magnitudes in the base currency
        let magnitude = fx_convert(conn, date, amount, &currency, &base)?.abs();

        total.add(&kind, magnitude);
        if let Some(cid) = category_id {
            by_category.entry(cid).or_default().add(&kind, magnitude);
        }
        active_days.insert(date);
        if magnitude > largest {
            largest = magnitude;
        }
        magnitude_sum += magnitude;
    }
    drop(stmt);

    let average = if total.count > 0 {
        (magnitude_sum / Decimal::from(total.count)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let mut out = Vec::with_capacity(1 + by_category.len());
    out.push(MonthlyRollup {
        household_id,
        month: key.clone(),
        category_id: None,
        income: total.income,
        expense: total.expense,
        transfers: total.transfers,
        txn_count: total.count,
        active_days: Some(active_days.len() as i64),
        largest_txn: Some(largest),
        average_txn: Some(average),
    });
    for (cid, bucket) in by_category {
        out.push(MonthlyRollup {
            household_id,
            month: key.clone(),
            category_id: Some(cid),
            income: bucket.income,
            expense: bucket.expense,
            transfers: bucket.transfers,
            txn_count: bucket.count,
            active_days: None,
            largest_txn: None,
            average_txn: None,
        });
    }

    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM monthly_rollups WHERE household_id=?1 AND month=?2",
        params![household_id, key],
    )?;
    {
        let mut insert = tx.prepare_cached(
            "INSERT INTO monthly_rollups(household_id, month, category_id, income, expense,
                                         transfers, txn_count, active_days, largest_txn, average_txn)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for row in &out {
            insert.execute(params![
                row.household_id,
                row.month,
                row.category_id,
                row.income.to_string(),
                row.expense.to_string(),
                row.transfers.to_string(),
                row.txn_count,
                row.active_days,
                row.largest_txn.map(|d| d.to_string()),
                row.average_txn.map(|d| d.to_string()),
            ])?;
        }
    }
    tx.commit()?;

    Ok(out)
}
