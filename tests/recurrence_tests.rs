// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use hearthledger::engine::recurrence::next_occurrence;
use hearthledger::models::{Frequency, RecurrenceRule};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn rule(frequency: Frequency) -> RecurrenceRule {
    RecurrenceRule {
        frequency,
        day_of_week: None,
        day_of_month: None,
        month_of_year: None,
        starts_on: d(2020, 1, 1),
        ends_on: None,
    }
}

#[test]
fn future_start_is_returned_unchanged() {
    for freq in [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ] {
        let mut r = rule(freq);
        r.starts_on = d(2025, 9, 1);
        assert_eq!(next_occurrence(&r, d(2025, 8, 7)).unwrap(), d(2025, 9, 1));
        assert_eq!(next_occurrence(&r, d(2020, 1, 1)).unwrap(), d(2025, 9, 1));
    }
}

#[test]
fn daily_advances_one_day() {
    let r = rule(Frequency::Daily);
    assert_eq!(next_occurrence(&r, d(2025, 8, 7)).unwrap(), d(2025, 8, 8));
    assert_eq!(next_occurrence(&r, d(2025, 12, 31)).unwrap(), d(2026, 1, 1));
}

#[test]
fn weekly_lands_on_the_target_weekday() {
    let mut r = rule(Frequency::Weekly);
    r.day_of_week = Some(1); // Monday
    // 2025-08-07 is a Thursday
    assert_eq!(next_occurrence(&r, d(2025, 8, 7)).unwrap(), d(2025, 8, 11));
}

#[test]
fn weekly_on_matching_weekday_never_returns_the_reference() {
    let mut r = rule(Frequency::Weekly);
    r.day_of_week = Some(1);
    // 2025-08-04 is a Monday: a full week out, not the same day
    assert_eq!(next_occurrence(&r, d(2025, 8, 4)).unwrap(), d(2025, 8, 11));
}

#[test]
fn weekly_without_anchor_advances_seven_days() {
    let r = rule(Frequency::Weekly);
    assert_eq!(next_occurrence(&r, d(2025, 8, 7)).unwrap(), d(2025, 8, 14));
}

#[test]
fn biweekly_is_fourteen_days_flat() {
    let r = rule(Frequency::Biweekly);
    assert_eq!(next_occurrence(&r, d(2025, 8, 7)).unwrap(), d(2025, 8, 21));
}

#[test]
fn monthly_targets_the_following_month() {
    let mut r = rule(Frequency::Monthly);
    assert_eq!(next_occurrence(&r, d(2025, 4, 15)).unwrap(), d(2025, 5, 1));
    r.day_of_month = Some(31);
    // May has 31 days, so no clamping applies
    assert_eq!(next_occurrence(&r, d(2025, 4, 15)).unwrap(), d(2025, 5, 31));
}

#[test]
fn monthly_day_31_clamps_to_the_end_of_short_months() {
    let mut r = rule(Frequency::Monthly);
    r.day_of_month = Some(31);
    assert_eq!(next_occurrence(&r, d(2025, 1, 15)).unwrap(), d(2025, 2, 28));
    assert_eq!(next_occurrence(&r, d(2024, 1, 15)).unwrap(), d(2024, 2, 29));
    assert_eq!(next_occurrence(&r, d(2025, 3, 31)).unwrap(), d(2025, 4, 30));
}

#[test]
fn quarterly_jumps_to_the_next_quarter_start_month() {
    let mut r = rule(Frequency::Quarterly);
    r.day_of_month = Some(15);
    assert_eq!(next_occurrence(&r, d(2025, 2, 10)).unwrap(), d(2025, 4, 15));
    assert_eq!(next_occurrence(&r, d(2025, 4, 20)).unwrap(), d(2025, 7, 15));
    assert_eq!(next_occurrence(&r, d(2025, 11, 20)).unwrap(), d(2026, 1, 15));
}

#[test]
fn quarterly_clamps_day_31_in_short_quarter_months() {
    let mut r = rule(Frequency::Quarterly);
    r.day_of_month = Some(31);
    assert_eq!(next_occurrence(&r, d(2025, 1, 10)).unwrap(), d(2025, 4, 30));
}

#[test]
fn yearly_uses_the_current_year_while_still_ahead() {
    let mut r = rule(Frequency::Yearly);
    r.month_of_year = Some(12);
    r.day_of_month = Some(25);
    assert_eq!(next_occurrence(&r, d(2025, 8, 7)).unwrap(), d(2025, 12, 25));
    // on the day itself, roll to next year
    assert_eq!(next_occurrence(&r, d(2025, 12, 25)).unwrap(), d(2026, 12, 25));
    assert_eq!(next_occurrence(&r, d(2025, 12, 26)).unwrap(), d(2026, 12, 25));
}

#[test]
fn yearly_clamps_leap_day_in_common_years() {
    let mut r = rule(Frequency::Yearly);
    r.month_of_year = Some(2);
    r.day_of_month = Some(29);
    assert_eq!(next_occurrence(&r, d(2025, 3, 1)).unwrap(), d(2026, 2, 28));
    assert_eq!(next_occurrence(&r, d(2024, 1, 1)).unwrap(), d(2024, 2, 29));
}

#[test]
fn invalid_rule_fields_are_rejected() {
    let mut r = rule(Frequency::Weekly);
    r.day_of_week = Some(9);
    assert!(next_occurrence(&r, d(2025, 8, 7)).is_err());

    let mut r = rule(Frequency::Yearly);
    r.month_of_year = Some(13);
    assert!(next_occurrence(&r, d(2025, 8, 7)).is_err());
}
