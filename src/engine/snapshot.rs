// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::NetWorthSnapshot;
use crate::utils::{fx_convert, get_base_currency};

// Account types valued off the price cache instead of the stored balance.
const MARKET_PRICED: [&str; 2] = ["investment", "crypto"];

/// Point-in-time net worth for one household, upserted on (household, day of
/// `as_of`) so same-day reruns overwrite rather than duplicate.
///
/// Market-priced accounts degrade to their stored balance when holdings or
/// prices cannot be resolved; the snapshot itself never fails over one
/// account's valuation.
pub fn build_snapshot(
    conn: &Connection,
    household_id: i64,
    as_of: NaiveDate,
) -> Result<NetWorthSnapshot> {
    let base = get_base_currency(conn)?;

    let mut stmt = conn.prepare(
        "SELECT id, name, type, currency, balance FROM accounts
         WHERE household_id=?1 AND is_active=1 AND include_in_net_worth=1 ORDER BY id",
    )?;
    let accounts = stmt.query_map(params![household_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;

    let mut total_assets = Decimal::ZERO;
    let mut total_liabilities = Decimal::ZERO;
    let mut breakdown: BTreeMap<String, Decimal> = BTreeMap::new();

    for account in accounts {
        let (account_id, name, kind, currency, balance_s) = account?;
        let balance = balance_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid balance '{}' for account {}", balance_s, name))?;

        let valuation = if MARKET_PRICED.contains(&kind.as_str()) {
            // degraded-accuracy fallback: keep the stored balance when the
            // price cache cannot value the holdings
            match market_value(conn, account_id) {
                Ok(Some(v)) => v,
                Ok(None) | Err(_) => balance,
            }
        } else {
            balance
        };
        let valuation = fx_convert(conn, as_of, valuation, &currency, &base)?;

        if kind == "debt" || valuation < Decimal::ZERO {
            total_liabilities += valuation.abs();
        } else {
            total_assets += valuation;
        }
        *breakdown.entry(kind).or_insert(Decimal::ZERO) += valuation;
    }

    let net_worth = total_assets - total_liabilities;
    let breakdown_json = serde_json::to_string(&breakdown)?;

    conn.execute(
        "INSERT INTO net_worth_snapshots(household_id, day, total_assets, total_liabilities,
                                         net_worth, breakdown, currency)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(household_id, day) DO UPDATE SET
            total_assets=excluded.total_assets,
            total_liabilities=excluded.total_liabilities,
            net_worth=excluded.net_worth,
            breakdown=excluded.breakdown,
            currency=excluded.currency",
        params![
            household_id,
            as_of.to_string(),
            total_assets.to_string(),
            total_liabilities.to_string(),
            net_worth.to_string(),
            breakdown_json,
            base
        ],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM net_worth_snapshots WHERE household_id=?1 AND day=?2",
        params![household_id, as_of.to_string()],
        |r| r.get(0),
    )?;

    Ok(NetWorthSnapshot {
        id,
        household_id,
        day: as_of,
        total_assets,
        total_liabilities,
        net_worth,
        breakdown,
        currency: base,
    })
}

/// Sum of quantity x latest cached price over the account's holdings, in the
/// account's own currency. None when the account has no holdings or any held
/// symbol has no cached price.
fn market_value(conn: &Connection, account_id: i64) -> Result<Option<Decimal>> {
    let mut stmt =
        conn.prepare_cached("SELECT symbol, quantity FROM holdings WHERE account_id=?1")?;
    let rows = stmt.query_map(params![account_id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?;

    let mut total = Decimal::ZERO;
    let mut any = false;
    for row in rows {
        let (symbol, qty_s) = row?;
        let qty = qty_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid quantity '{}' for {}", qty_s, symbol))?;
        let price_s: Option<String> = conn
            .query_row(
                "SELECT price FROM prices WHERE symbol=?1 ORDER BY as_of DESC, rowid DESC LIMIT 1",
                params![symbol],
                |r| r.get(0),
            )
            .optional()?;
        let Some(price_s) = price_s else {
            return Ok(None);
        };
        let price = price_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid stored price '{}' for {}", price_s, symbol))?;
        total += qty * price;
        any = true;
    }
    Ok(if any { Some(total) } else { None })
}
