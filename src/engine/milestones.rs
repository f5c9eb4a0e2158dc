// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Datelike, Days, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{AlertLevel, NotificationKind, NotificationPayload};
use crate::utils::{fx_convert, get_base_currency, month_bounds, month_key, parse_date};

const BILL_WINDOW_DAYS: u64 = 3;
const GOAL_MILESTONES: [u32; 4] = [100, 75, 50, 25];
const RENEWAL_BOUNDARIES: [i64; 3] = [30, 7, 1];

#[derive(Debug, Default, Serialize)]
pub struct MilestoneOutcome {
    pub emitted: usize,
    pub warnings: Vec<String>,
}

struct Emit {
    kind: NotificationKind,
    priority: &'static str,
    title: String,
    body: String,
    link: Option<String>,
    resource_type: &'static str,
    resource_id: i64,
    trigger: String,
    payload: NotificationPayload,
}

/// Scan the household's schedules, goals, budgets and insurance policies and
/// emit notifications for conditions that are newly true as of `today`. Every
/// notification fans out to all household members. Families and individual
/// items are fault-isolated; failures land in `warnings`.
pub fn evaluate(conn: &Connection, household_id: i64, today: NaiveDate) -> Result<MilestoneOutcome> {
    let members = household_members(conn, household_id)?;
    let mut outcome = MilestoneOutcome::default();
    if members.is_empty() {
        return Ok(outcome);
    }

    let families: [(&str, FamilyFn); 4] = [
        ("bill reminders", bill_reminders),
        ("goal milestones", goal_milestones),
        ("budget alerts", budget_alerts),
        ("insurance renewals", renewal_reminders),
    ];
    for (label, family) in families {
        match family(conn, household_id, &members, today, &mut outcome.warnings) {
            Ok(n) => outcome.emitted += n,
            Err(e) => outcome.warnings.push(format!("{}: {:#}", label, e)),
        }
    }
    Ok(outcome)
}

type FamilyFn = fn(&Connection, i64, &[i64], NaiveDate, &mut Vec<String>) -> Result<usize>;

fn household_members(conn: &Connection, household_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE household_id=?1 ORDER BY id")?;
    let rows = stmt.query_map(params![household_id], |r| r.get::<_, i64>(0))?;
    let mut members = Vec::new();
    for row in rows {
        members.push(row?);
    }
    Ok(members)
}

/// Active schedules due inside the forward window; deduped per schedule over
/// the last 24 hours.
fn bill_reminders(
    conn: &Connection,
    household_id: i64,
    members: &[i64],
    today: NaiveDate,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    let horizon = today + Days::new(BILL_WINDOW_DAYS);
    let mut stmt = conn.prepare(
        "SELECT id, description, amount, currency, next_occurrence FROM recurring_schedules
         WHERE household_id=?1 AND is_active=1 AND next_occurrence IS NOT NULL
           AND next_occurrence>=?2 AND next_occurrence<=?3
         ORDER BY next_occurrence, id",
    )?;
    let rows = stmt.query_map(
        params![household_id, today.to_string(), horizon.to_string()],
        |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        },
    )?;

    let mut emitted = 0;
    for row in rows {
        let (id, description, amount_s, currency, due_s) = row?;
        let result: Result<usize> = (|| {
            let since = today - Days::new(1);
            if already_notified_since(conn, NotificationKind::BillReminder, "recurring_schedule", id, None, since)? {
                return Ok(0);
            }
            let due_on = parse_date(&due_s)?;
            let amount = amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}'", amount_s))?;
            deliver(
                conn,
                members,
                today,
                Emit {
                    kind: NotificationKind::BillReminder,
                    priority: if due_on <= today + Days::new(1) { "high" } else { "normal" },
                    title: format!("Upcoming bill: {}", description),
                    body: format!(
                        "{} for {} {} is due on {}.",
                        description,
                        amount.abs().round_dp(2),
                        currency,
                        due_on
                    ),
                    link: Some(format!("/schedules/{}", id)),
                    resource_type: "recurring_schedule",
                    resource_id: id,
                    trigger: due_s.clone(),
                    payload: NotificationPayload::BillReminder {
                        schedule_id: id,
                        due_on,
                        amount,
                        currency: currency.clone(),
                    },
                },
            )
        })();
        match result {
            Ok(n) => emitted += n,
            Err(e) => warnings.push(format!("schedule '{}': {:#}", description, e)),
        }
    }
    Ok(emitted)
}

/// Highest of 25/50/75/100 at or below the goal's progress; each milestone
/// value fires once per goal, ever.
fn goal_milestones(
    conn: &Connection,
    household_id: i64,
    members: &[i64],
    today: NaiveDate,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT id, name, target_amount, current_amount FROM goals
         WHERE household_id=?1 AND is_active=1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![household_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;

    let mut emitted = 0;
    for row in rows {
        let (id, name, target_s, current_s) = row?;
        let result: Result<usize> = (|| {
            let target = target_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid target amount '{}'", target_s))?;
            if target <= Decimal::ZERO {
                return Ok(0);
            }
            let current = current_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid current amount '{}'", current_s))?;
            let progress = current / target * Decimal::from(100);
            let Some(milestone) = GOAL_MILESTONES
                .into_iter()
                .find(|m| progress >= Decimal::from(*m))
            else {
                return Ok(0);
            };
            if already_notified_ever(conn, NotificationKind::GoalMilestone, "goal", id, &milestone.to_string())? {
                return Ok(0);
            }
            deliver(
                conn,
                members,
                today,
                Emit {
                    kind: NotificationKind::GoalMilestone,
                    priority: if milestone == 100 { "high" } else { "normal" },
                    title: if milestone == 100 {
                        format!("Goal reached: {}", name)
                    } else {
                        format!("Goal milestone: {}", name)
                    },
                    body: format!(
                        "{} is at {}% of its target.",
                        name,
                        progress.round_dp(0)
                    ),
                    link: Some(format!("/goals/{}", id)),
                    resource_type: "goal",
                    resource_id: id,
                    trigger: milestone.to_string(),
                    payload: NotificationPayload::GoalMilestone {
                        goal_id: id,
                        milestone,
                        progress_percent: progress.round_dp(2),
                    },
                },
            )
        })();
        match result {
            Ok(n) => emitted += n,
            Err(e) => warnings.push(format!("goal '{}': {:#}", name, e)),
        }
    }
    Ok(emitted)
}

/// Period-to-date spend vs budgeted amount for the current calendar month.
/// critical at >=100% of the amount, warning at the configured threshold;
/// the two levels dedup independently over a 3-day window.
fn budget_alerts(
    conn: &Connection,
    household_id: i64,
    members: &[i64],
    today: NaiveDate,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    let key = month_key(today.year(), today.month());
    let (first, next_first) = month_bounds(&key)?;
    let base = get_base_currency(conn)?;

    let mut stmt = conn.prepare(
        "SELECT b.id, b.category_id, b.amount, b.alert_threshold, c.name
         FROM budgets b JOIN categories c ON b.category_id=c.id
         WHERE b.household_id=?1 AND b.is_active=1 AND b.alerts_enabled=1 ORDER BY b.id",
    )?;
    let rows = stmt.query_map(params![household_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;

    let mut emitted = 0;
    for row in rows {
        let (id, category_id, amount_s, threshold_s, category) = row?;
        let result: Result<usize> = (|| {
            let budgeted = amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid budget amount '{}'", amount_s))?;
            if budgeted <= Decimal::ZERO {
                return Ok(0);
            }
            let threshold = threshold_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid alert threshold '{}'", threshold_s))?;
            let spent = category_spend(conn, household_id, category_id, first, next_first, &base)?;
            let percent = spent / budgeted * Decimal::from(100);

            let level = if spent >= budgeted {
                AlertLevel::Critical
            } else if percent >= threshold {
                AlertLevel::Warning
            } else {
                return Ok(0);
            };
            let since = today - Days::new(3);
            if already_notified_since(conn, NotificationKind::BudgetWarning, "budget", id, Some(level.as_str()), since)? {
                return Ok(0);
            }
            deliver(
                conn,
                members,
                today,
                Emit {
                    kind: NotificationKind::BudgetWarning,
                    priority: match level {
                        AlertLevel::Critical => "high",
                        AlertLevel::Warning => "normal",
                    },
                    title: format!("Budget {}: {}", level.as_str(), category),
                    body: format!(
                        "Spent {} of {} {} ({}%) on {} this month.",
                        spent.round_dp(2),
                        budgeted.round_dp(2),
                        base,
                        percent.round_dp(0),
                        category
                    ),
                    link: Some(format!("/budgets/{}", id)),
                    resource_type: "budget",
                    resource_id: id,
                    trigger: level.as_str().to_string(),
                    payload: NotificationPayload::BudgetAlert {
                        budget_id: id,
                        level,
                        percent_spent: percent.round_dp(2),
                        spent,
                        budgeted,
                    },
                },
            )
        })();
        match result {
            Ok(n) => emitted += n,
            Err(e) => warnings.push(format!("budget '{}': {:#}", category, e)),
        }
    }
    Ok(emitted)
}

/// Renewal reminders exactly at the 30/7/1-day-out boundaries, each boundary
/// firing once per policy.
fn renewal_reminders(
    conn: &Connection,
    household_id: i64,
    members: &[i64],
    today: NaiveDate,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT id, name, renewal_date FROM insurance_policies
         WHERE household_id=?1 AND is_active=1 AND renewal_date>?2 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![household_id, today.to_string()], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;

    let mut emitted = 0;
    for row in rows {
        let (id, name, renewal_s) = row?;
        let result: Result<usize> = (|| {
            let renews_on = parse_date(&renewal_s)?;
            let days_ahead = (renews_on - today).num_days();
            if !RENEWAL_BOUNDARIES.contains(&days_ahead) {
                return Ok(0);
            }
            if already_notified_ever(conn, NotificationKind::RenewalReminder, "insurance_policy", id, &days_ahead.to_string())? {
                return Ok(0);
            }
            deliver(
                conn,
                members,
                today,
                Emit {
                    kind: NotificationKind::RenewalReminder,
                    priority: if days_ahead == 1 { "high" } else { "normal" },
                    title: format!("Insurance renewal: {}", name),
                    body: format!("{} renews in {} days, on {}.", name, days_ahead, renews_on),
                    link: Some(format!("/insurance/{}", id)),
                    resource_type: "insurance_policy",
                    resource_id: id,
                    trigger: days_ahead.to_string(),
                    payload: NotificationPayload::RenewalReminder {
                        policy_id: id,
                        days_ahead,
                        renews_on,
                    },
                },
            )
        })();
        match result {
            Ok(n) => emitted += n,
            Err(e) => warnings.push(format!("policy '{}': {:#}", name, e)),
        }
    }
    Ok(emitted)
}

fn category_spend(
    conn: &Connection,
    household_id: i64,
    category_id: i64,
    first: NaiveDate,
    next_first: NaiveDate,
    base: &str,
) -> Result<Decimal> {
    let mut stmt = conn.prepare_cached(
        "SELECT date, amount, currency FROM transactions
         WHERE household_id=?1 AND category_id=?2 AND kind='expense' AND status='cleared'
           AND date>=?3 AND date<?4",
    )?;
    let mut rows = stmt.query(params![
        household_id,
        category_id,
        first.to_string(),
        next_first.to_string()
    ])?;
    let mut spent = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let date_s: String = r.get(0)?;
        let amount_s: String = r.get(1)?;
        let currency: String = r.get(2)?;
        let date = parse_date(&date_s)?;
        let amount = amount_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' on {}", amount_s, date_s))?
            .abs();
        spent += fx_convert(conn, date, amount, &currency, base)?;
    }
    Ok(spent)
}

fn already_notified_since(
    conn: &Connection,
    kind: NotificationKind,
    resource_type: &str,
    resource_id: i64,
    trigger: Option<&str>,
    since: NaiveDate,
) -> Result<bool> {
    let hit: Option<i64> = match trigger {
        Some(t) => conn
            .query_row(
                "SELECT 1 FROM notifications
                 WHERE kind=?1 AND resource_type=?2 AND resource_id=?3 AND trigger_value=?4
                   AND created_at>=?5 LIMIT 1",
                params![kind.as_str(), resource_type, resource_id, t, since.to_string()],
                |r| r.get(0),
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT 1 FROM notifications
                 WHERE kind=?1 AND resource_type=?2 AND resource_id=?3 AND created_at>=?4 LIMIT 1",
                params![kind.as_str(), resource_type, resource_id, since.to_string()],
                |r| r.get(0),
            )
            .optional()?,
    };
    Ok(hit.is_some())
}

fn already_notified_ever(
    conn: &Connection,
    kind: NotificationKind,
    resource_type: &str,
    resource_id: i64,
    trigger: &str,
) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM notifications
             WHERE kind=?1 AND resource_type=?2 AND resource_id=?3 AND trigger_value=?4 LIMIT 1",
            params![kind.as_str(), resource_type, resource_id, trigger],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// One notification row per household member.
fn deliver(conn: &Connection, members: &[i64], today: NaiveDate, emit: Emit) -> Result<usize> {
    let payload = serde_json::to_string(&emit.payload)?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO notifications(user_id, title, body, kind, priority, link,
                                   resource_type, resource_id, trigger_value, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for user_id in members {
        stmt.execute(params![
            user_id,
            emit.title,
            emit.body,
            emit.kind.as_str(),
            emit.priority,
            emit.link,
            emit.resource_type,
            emit.resource_id,
            emit.trigger,
            payload,
            today.to_string()
        ])?;
    }
    Ok(members.len())
}
