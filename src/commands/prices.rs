// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;

use crate::utils::{http_client, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("fetch", _)) => fetch_prices(conn),
        Some(("list", _)) => list_prices(conn),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct YahooResponse {
    quoteResponse: QuoteResponse,
}
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct QuoteResponse {
    result: Vec<YahooQuote>,
}
#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    symbol: Option<String>,
}

fn list_prices(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT symbol, as_of, price, source FROM prices ORDER BY as_of DESC LIMIT 50",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (sym, ts, px, src) = row?;
        data.push(vec![sym, ts, px, src]);
    }
    println!(
        "{}",
        pretty_table(&["Symbol", "As Of", "Price", "Source"], data)
    );
    Ok(())
}

/// Refresh the price cache for every held symbol. The snapshot builder only
/// ever reads this cache; fetching stays out of the engine.
fn fetch_prices(conn: &mut Connection) -> Result<()> {
    let mut stmt = conn.prepare("SELECT DISTINCT symbol FROM holdings ORDER BY symbol")?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut symbols = Vec::new();
    for row in rows {
        symbols.push(row?);
    }
    drop(stmt);

    if symbols.is_empty() {
        println!("No held symbols to fetch");
        return Ok(());
    }

    let url = format!(
        "https://query1.finance.yahoo.com/v7/finance/quote?symbols={}",
        symbols.join(",")
    );
    let client = http_client()?;
    let resp = client.get(url).send()?.error_for_status()?;
    let yr: YahooResponse = resp.json()?;

    let held: HashSet<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let mut updates = Vec::with_capacity(yr.quoteResponse.result.len());
    for q in yr.quoteResponse.result {
        if let (Some(sym), Some(px)) = (q.symbol, q.regular_market_price) {
            if held.contains(sym.as_str()) {
                if let Some(px_decimal) = Decimal::from_f64_retain(px) {
                    updates.push((sym, px_decimal.to_string()));
                }
            }
        }
    }

    let now = Utc::now().to_rfc3339();
    if updates.is_empty() {
        println!("No Yahoo prices updated at {}", now);
        return Ok(());
    }

    let total_updates = updates.len();
    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare_cached(
            "INSERT OR IGNORE INTO prices(symbol, as_of, price, source) VALUES (?1, ?2, ?3, 'yahoo')",
        )?;
        for (symbol, price) in updates {
            insert.execute(params![symbol, &now, price])?;
        }
    }
    tx.commit()?;

    println!("Fetched {} prices at {}", total_updates, now);
    Ok(())
}
