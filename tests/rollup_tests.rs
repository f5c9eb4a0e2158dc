// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::str::FromStr;

use hearthledger::engine::rollup::build_rollup;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    hearthledger::db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO households(id, name) VALUES (1, 'Smith')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO accounts(id, household_id, name, type, currency) VALUES (1, 1, 'Checking', 'checking', 'USD')",
        [],
    )
    .unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (10, 'Groceries')", [])
        .unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (11, 'Dining')", [])
        .unwrap();
    conn
}

fn add_txn(conn: &Connection, date: &str, amount: &str, kind: &str, status: &str, category: Option<i64>) {
    conn.execute(
        "INSERT INTO transactions(household_id, account_id, date, amount, kind, status, category_id, currency)
         VALUES (1, 1, ?1, ?2, ?3, ?4, ?5, 'USD')",
        params![date, amount, kind, status, category],
    )
    .unwrap();
}

#[test]
fn rollup_aggregates_cleared_transactions_only() {
    let mut conn = setup();
    add_txn(&conn, "2025-07-01", "3000", "income", "cleared", None);
    add_txn(&conn, "2025-07-03", "-120.50", "expense", "cleared", Some(10));
    add_txn(&conn, "2025-07-03", "-80", "expense", "cleared", Some(11));
    add_txn(&conn, "2025-07-10", "-500", "transfer", "cleared", None);
    add_txn(&conn, "2025-07-12", "-50", "expense", "cleared", None); // uncategorized
    add_txn(&conn, "2025-07-15", "-999", "expense", "pending", Some(10));
    add_txn(&conn, "2025-07-16", "-999", "expense", "cancelled", Some(10));
    // outside the window
    add_txn(&conn, "2025-06-30", "-10", "expense", "cleared", Some(10));
    add_txn(&conn, "2025-08-01", "-10", "expense", "cleared", Some(10));

    let rows = build_rollup(&mut conn, 1, 2025, 7).unwrap();

    let total = rows.iter().find(|r| r.category_id.is_none()).unwrap();
    assert_eq!(total.income, Decimal::from_str("3000").unwrap());
    assert_eq!(total.expense, Decimal::from_str("250.50").unwrap());
    assert_eq!(total.transfers, Decimal::from_str("500").unwrap());
    assert_eq!(total.txn_count, 5);
    assert_eq!(total.active_days, Some(4));
    assert_eq!(total.largest_txn, Some(Decimal::from_str("3000").unwrap()));
    // (3000 + 120.50 + 80 + 500 + 50) / 5
    assert_eq!(total.average_txn, Some(Decimal::from_str("750.10").unwrap()));

    let groceries = rows.iter().find(|r| r.category_id == Some(10)).unwrap();
    assert_eq!(groceries.expense, Decimal::from_str("120.50").unwrap());
    assert_eq!(groceries.txn_count, 1);
    assert_eq!(groceries.active_days, None);
    assert_eq!(groceries.largest_txn, None);
    assert_eq!(groceries.average_txn, None);

    // uncategorized spend folds into totals without a category row
    assert_eq!(rows.len(), 3);
}

#[test]
fn rerun_replaces_rows_after_recategorization() {
    let mut conn = setup();
    add_txn(&conn, "2025-07-03", "-80", "expense", "cleared", Some(11));

    build_rollup(&mut conn, 1, 2025, 7).unwrap();
    let dining: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM monthly_rollups WHERE household_id=1 AND month='2025-07' AND category_id=11",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(dining, 1);

    conn.execute("UPDATE transactions SET category_id=10 WHERE category_id=11", [])
        .unwrap();
    build_rollup(&mut conn, 1, 2025, 7).unwrap();

    let (dining, groceries): (i64, i64) = conn
        .query_row(
            "SELECT SUM(CASE WHEN category_id=11 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN category_id=10 THEN 1 ELSE 0 END)
             FROM monthly_rollups WHERE household_id=1 AND month='2025-07'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(dining, 0);
    assert_eq!(groceries, 1);
}

#[test]
fn rerun_does_not_duplicate_rows() {
    let mut conn = setup();
    add_txn(&conn, "2025-07-03", "-80", "expense", "cleared", Some(10));

    build_rollup(&mut conn, 1, 2025, 7).unwrap();
    build_rollup(&mut conn, 1, 2025, 7).unwrap();

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM monthly_rollups WHERE household_id=1 AND month='2025-07'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 2); // total row + one category row
}

#[test]
fn empty_month_still_writes_a_zero_total_row() {
    let mut conn = setup();
    let rows = build_rollup(&mut conn, 1, 2025, 7).unwrap();
    assert_eq!(rows.len(), 1);
    let total = &rows[0];
    assert!(total.category_id.is_none());
    assert_eq!(total.txn_count, 0);
    assert_eq!(total.income, Decimal::ZERO);
    assert_eq!(total.active_days, Some(0));
}

#[test]
fn foreign_amounts_convert_through_stored_rates() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO fx_rates(date, base, quote, rate) VALUES ('2025-07-01', 'USD', 'EUR', '0.80')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO transactions(household_id, account_id, date, amount, kind, status, category_id, currency)
         VALUES (1, 1, '2025-07-05', '-8', 'expense', 'cleared', 10, 'EUR')",
        [],
    )
    .unwrap();

    let rows = build_rollup(&mut conn, 1, 2025, 7).unwrap();
    let total = rows.iter().find(|r| r.category_id.is_none()).unwrap();
    // 8 EUR / 0.80 = 10 USD
    assert_eq!(total.expense, Decimal::from_str("10").unwrap());
}

#[test]
fn invalid_month_is_an_error() {
    let mut conn = setup();
    assert!(build_rollup(&mut conn, 1, 2025, 13).is_err());
}
