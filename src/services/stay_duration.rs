use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{BillingError, BillingResult};

/// Flat billing month. Calendar month lengths are deliberately ignored.
pub const DAYS_PER_BILLING_MONTH: i64 = 30;

/// Billable length of a stay. Invariant: `months * 30 + extra_days == days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StayDuration {
    pub days: i64,
    pub months: i64,
    pub extra_days: i64,
}

impl StayDuration {
    pub fn from_days(days: i64) -> BillingResult<Self> {
        if days < 1 {
            return Err(BillingError::Validation(format!(
                "A stay must last at least one day, got {days}."
            )));
        }
        Ok(Self {
            days,
            months: days / DAYS_PER_BILLING_MONTH,
            extra_days: days % DAYS_PER_BILLING_MONTH,
        })
    }

    /// Whole billing months, rounding any remainder up.
    pub fn billed_months_rounded_up(&self) -> i64 {
        (self.days + DAYS_PER_BILLING_MONTH - 1) / DAYS_PER_BILLING_MONTH
    }

    /// `45 days (1 month, 15 days)`
    pub fn label(&self) -> String {
        let total = pluralize(self.days, "day", "days");
        if self.months == 0 {
            return total;
        }
        let months = pluralize(self.months, "month", "months");
        if self.extra_days == 0 {
            format!("{total} ({months})")
        } else {
            let extra = pluralize(self.extra_days, "day", "days");
            format!("{total} ({months}, {extra})")
        }
    }
}

pub fn pluralize(count: i64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Number of nights between check-in and check-out.
pub fn stay_duration(start: NaiveDate, end: NaiveDate) -> BillingResult<StayDuration> {
    if end <= start {
        return Err(BillingError::InvalidRange { start, end });
    }
    StayDuration::from_days((end - start).num_days())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{stay_duration, StayDuration};
    use crate::error::BillingError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn splits_forty_five_days_into_one_month_and_fifteen_days() {
        let duration = stay_duration(date(2024, 6, 10), date(2024, 7, 25)).unwrap();
        assert_eq!(
            duration,
            StayDuration {
                days: 45,
                months: 1,
                extra_days: 15
            }
        );
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        let same = stay_duration(date(2024, 6, 10), date(2024, 6, 10));
        assert!(matches!(same, Err(BillingError::InvalidRange { .. })));

        let inverted = stay_duration(date(2024, 6, 10), date(2024, 6, 1));
        assert!(matches!(inverted, Err(BillingError::InvalidRange { .. })));
    }

    #[test]
    fn month_and_extra_days_always_recompose_to_days() {
        let start = date(2023, 12, 1);
        for offset in 1..=400 {
            let end = start + chrono::Duration::days(offset);
            let duration = stay_duration(start, end).unwrap();
            assert_eq!(duration.days, offset);
            assert_eq!(duration.months * 30 + duration.extra_days, duration.days);
            assert!((0..30).contains(&duration.extra_days));
        }
    }

    #[test]
    fn uses_flat_thirty_day_months_across_february() {
        let duration = stay_duration(date(2024, 2, 1), date(2024, 3, 1)).unwrap();
        assert_eq!(duration.days, 29);
        assert_eq!(duration.months, 0);
        assert_eq!(duration.extra_days, 29);
    }

    #[test]
    fn renders_duration_labels() {
        assert_eq!(StayDuration::from_days(1).unwrap().label(), "1 day");
        assert_eq!(StayDuration::from_days(10).unwrap().label(), "10 days");
        assert_eq!(StayDuration::from_days(30).unwrap().label(), "30 days (1 month)");
        assert_eq!(
            StayDuration::from_days(45).unwrap().label(),
            "45 days (1 month, 15 days)"
        );
        assert_eq!(
            StayDuration::from_days(61).unwrap().label(),
            "61 days (2 months, 1 day)"
        );
    }

    #[test]
    fn rounds_partial_months_up() {
        assert_eq!(StayDuration::from_days(40).unwrap().billed_months_rounded_up(), 2);
        assert_eq!(StayDuration::from_days(30).unwrap().billed_months_rounded_up(), 1);
        assert_eq!(StayDuration::from_days(1).unwrap().billed_months_rounded_up(), 1);
    }
}
