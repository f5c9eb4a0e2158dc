// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{bail, Result};
use chrono::{Datelike, Days, NaiveDate};

use crate::models::{Frequency, RecurrenceRule};
use crate::utils::days_in_month;

/// Next occurrence of `rule` strictly after `reference`, except that a rule
/// whose start date is still in the future returns the start date unchanged.
///
/// Day-of-month values past the end of the target month clamp to the last
/// valid day (monthly/31 advanced from mid-January lands on Feb 28/29, not
/// Mar 2/3).
pub fn next_occurrence(rule: &RecurrenceRule, reference: NaiveDate) -> Result<NaiveDate> {
    if rule.starts_on > reference {
        return Ok(rule.starts_on);
    }
    match rule.frequency {
        Frequency::Daily => Ok(reference + Days::new(1)),
        Frequency::Weekly => {
            let step = match rule.day_of_week {
                Some(dow) => {
                    if dow > 6 {
                        bail!("Invalid day of week {}", dow);
                    }
                    let current = reference.weekday().num_days_from_sunday();
                    match (dow + 7 - current) % 7 {
                        // already on the target weekday: a full week out, never today
                        0 => 7,
                        d => d,
                    }
                }
                None => 7,
            };
            Ok(reference + Days::new(u64::from(step)))
        }
        Frequency::Biweekly => Ok(reference + Days::new(14)),
        Frequency::Monthly => {
            let (year, month) = next_month(reference.year(), reference.month());
            clamped_date(year, month, rule.day_of_month.unwrap_or(1))
        }
        Frequency::Quarterly => {
            let (year, month) = next_quarter_start(reference.year(), reference.month());
            clamped_date(year, month, rule.day_of_month.unwrap_or(1))
        }
        Frequency::Yearly => {
            let month = rule.month_of_year.unwrap_or(1);
            let day = rule.day_of_month.unwrap_or(1);
            let this_year = clamped_date(reference.year(), month, day)?;
            if this_year > reference {
                Ok(this_year)
            } else {
                clamped_date(reference.year() + 1, month, day)
            }
        }
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

/// First month of the quarter after the one containing `month`: Jan/Apr/Jul/Oct.
fn next_quarter_start(year: i32, month: u32) -> (i32, u32) {
    let start = ((month - 1) / 3 + 1) * 3 + 1;
    if start > 12 { (year + 1, start - 12) } else { (year, start) }
}

fn clamped_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    if !(1..=12).contains(&month) {
        bail!("Invalid month of year {}", month);
    }
    if day == 0 {
        bail!("Invalid day of month {}", day);
    }
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow::anyhow!("Invalid date {}-{}-{}", year, month, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_starts_wrap_the_year() {
        assert_eq!(next_quarter_start(2025, 1), (2025, 4));
        assert_eq!(next_quarter_start(2025, 2), (2025, 4));
        assert_eq!(next_quarter_start(2025, 4), (2025, 7));
        assert_eq!(next_quarter_start(2025, 9), (2025, 10));
        assert_eq!(next_quarter_start(2025, 10), (2026, 1));
        assert_eq!(next_quarter_start(2025, 12), (2026, 1));
    }

    #[test]
    fn clamping_stops_at_month_end() {
        let d = clamped_date(2025, 2, 31).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        let leap = clamped_date(2024, 2, 30).unwrap();
        assert_eq!(leap, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(clamped_date(2025, 13, 1).is_err());
        assert!(clamped_date(2025, 6, 0).is_err());
    }
}
