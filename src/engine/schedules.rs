// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::recurrence::next_occurrence;
use crate::models::{Frequency, RecurrenceRule, RecurringSchedule};
use crate::utils::parse_date;

// Catch-up bound for schedules that have not run in a long time; a daily rule
// two years behind stays well under this.
const MAX_CATCH_UP: usize = 1000;

#[derive(Debug, Default, Serialize)]
pub struct AdvanceOutcome {
    pub advanced: usize,
    pub transactions_created: usize,
    pub warnings: Vec<String>,
}

/// Move every due schedule of the household forward to its next future
/// occurrence, materializing cleared ledger transactions for `auto_create`
/// schedules along the way. Each schedule is advanced in its own storage
/// transaction; one schedule's failure is recorded and the rest continue.
pub fn advance_due(
    conn: &mut Connection,
    household_id: i64,
    today: NaiveDate,
) -> Result<AdvanceOutcome> {
    let schedules = load_active(conn, household_id)?;
    let mut outcome = AdvanceOutcome::default();

    for schedule in schedules {
        match advance_one(conn, &schedule, today) {
            Ok(Some(created)) => {
                outcome.advanced += 1;
                outcome.transactions_created += created;
            }
            Ok(None) => {}
            Err(e) => outcome
                .warnings
                .push(format!("schedule '{}': {:#}", schedule.description, e)),
        }
    }
    Ok(outcome)
}

pub fn load_active(conn: &Connection, household_id: i64) -> Result<Vec<RecurringSchedule>> {
    let mut stmt = conn.prepare(
        "SELECT id, description, amount, currency, account_id, counter_account_id, category_id,
                frequency, day_of_week, day_of_month, month_of_year, starts_on, ends_on,
                next_occurrence, last_occurrence, occurrence_count, auto_create
         FROM recurring_schedules WHERE household_id=?1 AND is_active=1 ORDER BY id",
    )?;
    let mut rows = stmt.query(params![household_id])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let description: String = r.get(1)?;
        let amount_s: String = r.get(2)?;
        let freq_s: String = r.get(7)?;
        let starts_s: String = r.get(11)?;
        let ends_s: Option<String> = r.get(12)?;
        let next_s: Option<String> = r.get(13)?;
        let last_s: Option<String> = r.get(14)?;
        out.push(RecurringSchedule {
            id,
            household_id,
            description: description.clone(),
            amount: amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' for '{}'", amount_s, description))?,
            currency: r.get(3)?,
            account_id: r.get(4)?,
            counter_account_id: r.get(5)?,
            category_id: r.get(6)?,
            rule: RecurrenceRule {
                frequency: freq_s.parse::<Frequency>()?,
                day_of_week: r.get(8)?,
                day_of_month: r.get(9)?,
                month_of_year: r.get(10)?,
                starts_on: parse_date(&starts_s)?,
                ends_on: ends_s.as_deref().map(parse_date).transpose()?,
            },
            next_occurrence: next_s.as_deref().map(parse_date).transpose()?,
            last_occurrence: last_s.as_deref().map(parse_date).transpose()?,
            occurrence_count: r.get(15)?,
            auto_create: r.get(16)?,
            active: true,
        });
    }
    Ok(out)
}

/// Returns Some(transactions created) when the schedule moved, None when it
/// was not due yet.
fn advance_one(
    conn: &mut Connection,
    schedule: &RecurringSchedule,
    today: NaiveDate,
) -> Result<Option<usize>> {
    let mut next = match schedule.next_occurrence {
        Some(d) => d,
        // freshly created schedule: seed next_occurrence and stop
        None => {
            let seeded = next_occurrence(&schedule.rule, today)?;
            conn.execute(
                "UPDATE recurring_schedules SET next_occurrence=?1 WHERE id=?2",
                params![seeded.to_string(), schedule.id],
            )?;
            return Ok(Some(0));
        }
    };
    if next > today {
        return Ok(None);
    }

    let mut last = schedule.last_occurrence;
    let mut count = schedule.occurrence_count;
    let mut created = 0usize;
    let mut still_active = true;

    let tx = conn.transaction()?;
    let mut steps = 0usize;
    while next <= today {
        steps += 1;
        if steps > MAX_CATCH_UP {
            bail!("More than {} pending occurrences, refusing to catch up", MAX_CATCH_UP);
        }
        if schedule.auto_create {
            let kind = if schedule.counter_account_id.is_some() {
                "transfer"
            } else if schedule.amount < Decimal::ZERO {
                "expense"
            } else {
                "income"
            };
            tx.execute(
                "INSERT INTO transactions(household_id, account_id, date, amount, kind, status,
                                          payee, category_id, currency)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'cleared', ?6, ?7, ?8)",
                params![
                    schedule.household_id,
                    schedule.account_id,
                    next.to_string(),
                    schedule.amount.to_string(),
                    kind,
                    schedule.description,
                    schedule.category_id,
                    schedule.currency
                ],
            )?;
            created += 1;
        }
        last = Some(next);
        count += 1;
        next = next_occurrence(&schedule.rule, next)?;
        if let Some(ends_on) = schedule.rule.ends_on {
            if next > ends_on {
                still_active = false;
                break;
            }
        }
    }

    if still_active {
        tx.execute(
            "UPDATE recurring_schedules
             SET next_occurrence=?1, last_occurrence=?2, occurrence_count=?3 WHERE id=?4",
            params![
                next.to_string(),
                last.map(|d| d.to_string()),
                count,
                schedule.id
            ],
        )?;
    } else {
        tx.execute(
            "UPDATE recurring_schedules
             SET next_occurrence=NULL, last_occurrence=?1, occurrence_count=?2, is_active=0
             WHERE id=?3",
            params![last.map(|d| d.to_string()), count, schedule.id],
        )?;
    }
    tx.commit()?;
    Ok(Some(created))
}
