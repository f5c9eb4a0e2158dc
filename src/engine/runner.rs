// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::engine::{milestones, rollup, schedules, snapshot};
use crate::utils::{month_key, previous_month};

/// Rejected before any work starts, as opposed to per-household failures
/// which are recorded in the report.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid month {year:04}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("household '{0}' not found")]
    UnknownHousehold(String),
    #[error("no job types requested")]
    NoJobs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Schedules,
    Snapshot,
    Rollup,
    Milestones,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Schedules => "schedules",
            JobKind::Snapshot => "snapshot",
            JobKind::Rollup => "rollup",
            JobKind::Milestones => "milestones",
        }
    }
}

/// Parse a job type argument. `all` expands to every job, schedules first so
/// bill reminders see freshly advanced occurrences.
pub fn parse_job_types(s: &str) -> Result<Vec<JobKind>> {
    Ok(match s {
        "all" => vec![
            JobKind::Schedules,
            JobKind::Snapshot,
            JobKind::Rollup,
            JobKind::Milestones,
        ],
        "schedules" => vec![JobKind::Schedules],
        "snapshot" => vec![JobKind::Snapshot],
        "rollup" => vec![JobKind::Rollup],
        "milestones" => vec![JobKind::Milestones],
        other => anyhow::bail!(
            "Unknown job type '{}' (use snapshot|rollup|schedules|milestones|all)",
            other
        ),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Manual,
    Scheduler,
}

#[derive(Debug)]
pub struct RunRequest {
    pub jobs: Vec<JobKind>,
    pub household: Option<String>,
    pub year_month: Option<(i32, u32)>,
    pub as_of: NaiveDate,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub net_worth: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct HouseholdReport {
    pub household_id: i64,
    pub household: String,
    pub snapshot: Option<SnapshotSummary>,
    pub rollup_rows: Option<usize>,
    pub schedules_advanced: Option<usize>,
    pub notifications_emitted: Option<usize>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub as_of: NaiveDate,
    pub trigger: Trigger,
    pub jobs: Vec<JobKind>,
    pub rollup_month: String,
    pub processed: usize,
    pub failed: usize,
    pub households: Vec<HouseholdReport>,
}

/// Run the requested jobs over the target households. Input problems reject
/// the whole run up front; after that, one household's failure is recorded
/// and never stops the batch, and a completed household's writes stay put.
pub fn run(conn: &mut Connection, req: &RunRequest) -> Result<RunReport> {
    if req.jobs.is_empty() {
        return Err(RunnerError::NoJobs.into());
    }
    let (year, month) = req.year_month.unwrap_or_else(|| previous_month(req.as_of));
    if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
        return Err(RunnerError::InvalidMonth { year, month }.into());
    }

    let targets = resolve_households(conn, req.household.as_deref())?;

    let mut report = RunReport {
        as_of: req.as_of,
        trigger: req.trigger,
        jobs: req.jobs.clone(),
        rollup_month: month_key(year, month),
        processed: 0,
        failed: 0,
        households: Vec::with_capacity(targets.len()),
    };

    for (household_id, name) in targets {
        let mut hr = HouseholdReport {
            household_id,
            household: name,
            snapshot: None,
            rollup_rows: None,
            schedules_advanced: None,
            notifications_emitted: None,
            warnings: Vec::new(),
            error: None,
        };
        let mut errors = Vec::new();

        for job in &req.jobs {
            let step: Result<()> = match job {
                JobKind::Schedules => {
                    schedules::advance_due(conn, household_id, req.as_of).map(|outcome| {
                        hr.schedules_advanced = Some(outcome.advanced);
                        hr.warnings.extend(outcome.warnings);
                    })
                }
                JobKind::Snapshot => {
                    snapshot::build_snapshot(conn, household_id, req.as_of).map(|snap| {
                        hr.snapshot = Some(SnapshotSummary {
                            total_assets: snap.total_assets,
                            total_liabilities: snap.total_liabilities,
                            net_worth: snap.net_worth,
                        });
                    })
                }
                JobKind::Rollup => {
                    rollup::build_rollup(conn, household_id, year, month).map(|rows| {
                        hr.rollup_rows = Some(rows.len());
                    })
                }
                JobKind::Milestones => {
                    milestones::evaluate(conn, household_id, req.as_of).map(|outcome| {
                        hr.notifications_emitted = Some(outcome.emitted);
                        hr.warnings.extend(outcome.warnings);
                    })
                }
            };
            if let Err(e) = step {
                errors.push(format!("{}: {:#}", job.as_str(), e));
            }
        }

        if errors.is_empty() {
            report.processed += 1;
        } else {
            report.failed += 1;
            hr.error = Some(errors.join("; "));
        }
        report.households.push(hr);
    }
    Ok(report)
}

fn resolve_households(conn: &Connection, target: Option<&str>) -> Result<Vec<(i64, String)>> {
    match target {
        Some(name) => {
            let id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM households WHERE name=?1",
                    params![name],
                    |r| r.get(0),
                )
                .optional()?;
            match id {
                Some(id) => Ok(vec![(id, name.to_string())]),
                None => Err(RunnerError::UnknownHousehold(name.to_string()).into()),
            }
        }
        None => {
            let mut stmt = conn.prepare("SELECT id, name FROM households ORDER BY name")?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        }
    }
}
