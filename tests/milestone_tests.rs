// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use hearthledger::engine::milestones::evaluate;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    hearthledger::db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO households(id, name) VALUES (1, 'Smith')", [])
        .unwrap();
    conn.execute("INSERT INTO users(id, household_id, name) VALUES (1, 1, 'Ann')", [])
        .unwrap();
    conn.execute("INSERT INTO users(id, household_id, name) VALUES (2, 1, 'Ben')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO accounts(id, household_id, name, type, currency) VALUES (1, 1, 'Checking', 'checking', 'USD')",
        [],
    )
    .unwrap();
    conn.execute("INSERT INTO categories(id, name) VALUES (10, 'Groceries')", [])
        .unwrap();
    conn
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn notification_count(conn: &Connection, kind: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE kind=?1",
        params![kind],
        |r| r.get(0),
    )
    .unwrap()
}

fn add_schedule(conn: &Connection, description: &str, next: &str) {
    conn.execute(
        "INSERT INTO recurring_schedules(household_id, description, amount, currency, account_id,
                                         frequency, starts_on, next_occurrence)
         VALUES (1, ?1, '-45', 'USD', 1, 'monthly', '2024-01-01', ?2)",
        params![description, next],
    )
    .unwrap();
}

#[test]
fn bills_due_inside_the_window_fan_out_to_all_members() {
    let conn = setup();
    add_schedule(&conn, "Electricity", "2025-08-09");

    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 2);
    assert!(outcome.warnings.is_empty());
    assert_eq!(notification_count(&conn, "bill_reminder"), 2);

    // 24h dedup: a same-day rerun emits nothing new
    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 0);
    assert_eq!(notification_count(&conn, "bill_reminder"), 2);
}

#[test]
fn bills_outside_the_three_day_window_stay_quiet() {
    let conn = setup();
    add_schedule(&conn, "Water", "2025-08-12");

    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 0);

    // the boundary day itself is included
    add_schedule(&conn, "Gas", "2025-08-10");
    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 2);
}

#[test]
fn goal_at_82_percent_fires_exactly_the_75_milestone() {
    let conn = setup();
    conn.execute(
        "INSERT INTO goals(id, household_id, name, target_amount, current_amount)
         VALUES (5, 1, 'Emergency fund', '1000', '820')",
        [],
    )
    .unwrap();

    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 2);
    let trigger: String = conn
        .query_row(
            "SELECT DISTINCT trigger_value FROM notifications WHERE kind='goal_milestone' AND resource_id=5",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(trigger, "75");

    // still below 100: nothing new, even weeks later
    conn.execute("UPDATE goals SET current_amount='830' WHERE id=5", [])
        .unwrap();
    let outcome = evaluate(&conn, 1, day("2025-09-20")).unwrap();
    assert_eq!(outcome.emitted, 0);

    // crossing 100 fires the next milestone value
    conn.execute("UPDATE goals SET current_amount='1000' WHERE id=5", [])
        .unwrap();
    let outcome = evaluate(&conn, 1, day("2025-09-21")).unwrap();
    assert_eq!(outcome.emitted, 2);
    let hundred: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM notifications WHERE kind='goal_milestone' AND resource_id=5 AND trigger_value='100'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(hundred, 2);
}

fn add_budget_spend(conn: &Connection, date: &str, amount: &str) {
    conn.execute(
        "INSERT INTO transactions(household_id, account_id, date, amount, kind, status, category_id, currency)
         VALUES (1, 1, ?1, ?2, 'expense', 'cleared', 10, 'USD')",
        params![date, amount],
    )
    .unwrap();
}

#[test]
fn budget_warning_then_critical_are_distinct_dedup_keys() {
    let conn = setup();
    conn.execute(
        "INSERT INTO budgets(id, household_id, category_id, amount, alert_threshold)
         VALUES (7, 1, 10, '500', '80')",
        [],
    )
    .unwrap();
    add_budget_spend(&conn, "2025-08-05", "-410");

    // 410 / 500 = 82% -> warning, not critical
    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 2);
    let level: String = conn
        .query_row(
            "SELECT DISTINCT trigger_value FROM notifications WHERE kind='budget_warning' AND resource_id=7",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(level, "warning");

    // crossing 100% emits critical even while the warning's 3-day window is open
    add_budget_spend(&conn, "2025-08-08", "-110");
    let outcome = evaluate(&conn, 1, day("2025-08-08")).unwrap();
    assert_eq!(outcome.emitted, 2);
    let critical: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM notifications WHERE kind='budget_warning' AND resource_id=7 AND trigger_value='critical'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(critical, 2);

    // and the critical alert itself dedups inside its window
    let outcome = evaluate(&conn, 1, day("2025-08-09")).unwrap();
    assert_eq!(outcome.emitted, 0);
}

#[test]
fn budget_under_threshold_stays_quiet_and_pending_spend_is_ignored() {
    let conn = setup();
    conn.execute(
        "INSERT INTO budgets(id, household_id, category_id, amount, alert_threshold)
         VALUES (7, 1, 10, '500', '80')",
        [],
    )
    .unwrap();
    add_budget_spend(&conn, "2025-08-05", "-300");
    conn.execute(
        "INSERT INTO transactions(household_id, account_id, date, amount, kind, status, category_id, currency)
         VALUES (1, 1, '2025-08-06', '-250', 'expense', 'pending', 10, 'USD')",
        [],
    )
    .unwrap();

    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 0);
}

#[test]
fn renewal_boundaries_fire_exactly_once_each() {
    let conn = setup();
    conn.execute(
        "INSERT INTO insurance_policies(id, household_id, name, renewal_date)
         VALUES (3, 1, 'Home insurance', '2025-09-06')",
        [],
    )
    .unwrap();

    // 30 days out
    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 2);
    // 29 days out is not a boundary
    let outcome = evaluate(&conn, 1, day("2025-08-08")).unwrap();
    assert_eq!(outcome.emitted, 0);
    // 7 days out
    let outcome = evaluate(&conn, 1, day("2025-08-30")).unwrap();
    assert_eq!(outcome.emitted, 2);
    // rerunning the 30-day boundary never refires
    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 0);

    let triggers: i64 = conn
        .query_row(
            "SELECT COUNT(DISTINCT trigger_value) FROM notifications WHERE kind='renewal_reminder' AND resource_id=3",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(triggers, 2);
}

#[test]
fn one_bad_goal_does_not_stop_the_others() {
    let conn = setup();
    conn.execute(
        "INSERT INTO goals(id, household_id, name, target_amount, current_amount)
         VALUES (1, 1, 'Corrupt', 'not-a-number', '10')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO goals(id, household_id, name, target_amount, current_amount)
         VALUES (2, 1, 'Holiday', '1000', '600')",
        [],
    )
    .unwrap();

    let outcome = evaluate(&conn, 1, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 2); // the healthy goal's 50 milestone, both members
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("Corrupt"));
}

#[test]
fn households_without_members_emit_nothing() {
    let conn = setup();
    conn.execute("INSERT INTO households(id, name) VALUES (2, 'Empty')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO goals(household_id, name, target_amount, current_amount)
         VALUES (2, 'Ghost goal', '100', '100')",
        [],
    )
    .unwrap();

    let outcome = evaluate(&conn, 2, day("2025-08-07")).unwrap();
    assert_eq!(outcome.emitted, 0);
}
