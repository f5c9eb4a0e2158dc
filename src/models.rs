// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::bail;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "biweekly" => Frequency::Biweekly,
            "monthly" => Frequency::Monthly,
            "quarterly" => Frequency::Quarterly,
            "yearly" => Frequency::Yearly,
            other => bail!("Unknown frequency '{}'", other),
        })
    }
}

/// Calendar rule for one recurring event. `day_of_week` is 0=Sunday..6=Saturday
/// and only read for weekly rules; `day_of_month`/`month_of_year` only for
/// monthly/quarterly/yearly rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub day_of_week: Option<u32>,
    pub day_of_month: Option<u32>,
    pub month_of_year: Option<u32>,
    pub starts_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub id: i64,
    pub household_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub account_id: i64,
    pub counter_account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub rule: RecurrenceRule,
    pub next_occurrence: Option<NaiveDate>,
    pub last_occurrence: Option<NaiveDate>,
    pub occurrence_count: i64,
    pub auto_create: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Household {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub r#type: String,
    pub currency: String,
    pub balance: Decimal,
    pub include_in_net_worth: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetWorthSnapshot {
    pub id: i64,
    pub household_id: i64,
    pub day: NaiveDate,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub net_worth: Decimal,
    pub breakdown: BTreeMap<String, Decimal>,
    pub currency: String,
}

/// One aggregate row. `category_id == None` is the household total row; only
/// that row carries `active_days`, `largest_txn` and `average_txn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRollup {
    pub household_id: i64,
    pub month: String,
    pub category_id: Option<i64>,
    pub income: Decimal,
    pub expense: Decimal,
    pub transfers: Decimal,
    pub txn_count: i64,
    pub active_days: Option<i64>,
    pub largest_txn: Option<Decimal>,
    pub average_txn: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BillReminder,
    GoalMilestone,
    BudgetWarning,
    RenewalReminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BillReminder => "bill_reminder",
            NotificationKind::GoalMilestone => "goal_milestone",
            NotificationKind::BudgetWarning => "budget_warning",
            NotificationKind::RenewalReminder => "renewal_reminder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }
}

/// Typed metadata carried by a notification, keyed by family. The variant also
/// determines the dedup trigger value stored alongside the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    BillReminder {
        schedule_id: i64,
        due_on: NaiveDate,
        amount: Decimal,
        currency: String,
    },
    GoalMilestone {
        goal_id: i64,
        milestone: u32,
        progress_percent: Decimal,
    },
    BudgetAlert {
        budget_id: i64,
        level: AlertLevel,
        percent_spent: Decimal,
        spent: Decimal,
        budgeted: Decimal,
    },
    RenewalReminder {
        policy_id: i64,
        days_ahead: i64,
        renews_on: NaiveDate,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub priority: String,
    pub link: Option<String>,
    pub resource_type: String,
    pub resource_id: i64,
    pub trigger_value: String,
    pub payload: NotificationPayload,
    pub created_at: NaiveDate,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub household_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub alert_threshold: Decimal,
    pub alerts_enabled: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePolicy {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub renewal_date: NaiveDate,
    pub active: bool,
}
