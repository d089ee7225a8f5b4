use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::services::{
    reconciliation::{Obligation, ObligationId},
    stay_duration::pluralize,
};

pub const DEFAULT_DUE_WINDOW_DAYS: u32 = 5;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedObligation {
    #[serde(flatten)]
    pub obligation: Obligation,
    pub days_remaining: Option<i64>,
    pub due_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub due_soon: Vec<ClassifiedObligation>,
    pub general_unpaid: Vec<ClassifiedObligation>,
    /// Payable but already past due. Kept out of both buckets above.
    pub overdue: Vec<ClassifiedObligation>,
}

impl Classification {
    pub fn due_soon_ids(&self) -> Vec<ObligationId> {
        self.due_soon
            .iter()
            .map(|entry| entry.obligation.id.clone())
            .collect()
    }
}

/// Whole days from `now` until the start of `due_date` in `tz`, rounded up.
pub fn days_remaining(due_date: NaiveDate, now: DateTime<Utc>, tz: Tz) -> i64 {
    let local_midnight = due_date.and_time(chrono::NaiveTime::default());
    let due_at = tz
        .from_local_datetime(&local_midnight)
        .earliest()
        .map(|instant| instant.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local_midnight));

    let seconds = (due_at - now).num_seconds();
    if seconds > 0 {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    } else {
        seconds / SECONDS_PER_DAY
    }
}

/// `due today`, `1 day left`, `3 days left`, `2 days overdue`
pub fn due_label(days_remaining: i64) -> String {
    match days_remaining {
        0 => "due today".to_string(),
        n if n > 0 => format!("{} left", pluralize(n, "day", "days")),
        n => format!("{} overdue", pluralize(-n, "day", "days")),
    }
}

/// Splits payable obligations into a due-soon window and everything else.
///
/// `general_unpaid` is computed as the payable set minus the ids already in
/// `due_soon`, so the two buckets never overlap. Obligations without a due
/// date are payable but unscheduled and land in `general_unpaid`.
pub fn classify_obligations(
    obligations: &[Obligation],
    window_days: u32,
    now: DateTime<Utc>,
    tz: Tz,
) -> Classification {
    let window = i64::from(window_days);
    let payable: Vec<ClassifiedObligation> = obligations
        .iter()
        .filter(|obligation| obligation.status.is_payable())
        .map(|obligation| {
            let remaining = obligation
                .due_date
                .map(|due_date| days_remaining(due_date, now, tz));
            ClassifiedObligation {
                obligation: obligation.clone(),
                days_remaining: remaining,
                due_label: remaining.map(due_label),
            }
        })
        .collect();

    let due_soon: Vec<ClassifiedObligation> = payable
        .iter()
        .filter(|entry| entry.days_remaining.is_some_and(|days| (0..=window).contains(&days)))
        .cloned()
        .collect();
    let due_soon_ids: HashSet<&ObligationId> =
        due_soon.iter().map(|entry| &entry.obligation.id).collect();

    let mut general_unpaid = Vec::new();
    let mut overdue = Vec::new();
    for entry in payable.iter() {
        if due_soon_ids.contains(&entry.obligation.id) {
            continue;
        }
        if entry.days_remaining.is_some_and(|days| days < 0) {
            overdue.push(entry.clone());
        } else {
            general_unpaid.push(entry.clone());
        }
    }

    Classification {
        due_soon,
        general_unpaid,
        overdue,
    }
}
