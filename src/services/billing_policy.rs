use std::fmt;

use serde::{Deserialize, Serialize};

use crate::services::money::Money;

/// Canonical pricing strategy for a stay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPolicy {
    #[default]
    Monthly,
    Daily,
    MonthlyWithDaily,
}

impl BillingPolicy {
    /// Adapter for free-text labels coming from room listings. Anything
    /// unrecognised bills monthly.
    pub fn from_label(raw: &str) -> Self {
        match normalize_policy_label(raw).as_str() {
            "daily" | "per_day" | "nightly" => Self::Daily,
            "monthly_with_daily" | "monthly_daily" | "monthly_and_daily" | "hybrid" => {
                Self::MonthlyWithDaily
            }
            _ => Self::Monthly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Daily => "daily",
            Self::MonthlyWithDaily => "monthly_with_daily",
        }
    }
}

impl fmt::Display for BillingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim, lowercase, and collapse whitespace, hyphen, and underscore runs into
/// a single underscore. Idempotent.
pub fn normalize_policy_label(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('_');
        }
        pending_separator = false;
        normalized.extend(ch.to_lowercase());
    }
    normalized
}

/// Escalates plain monthly billing to the hybrid policy when a partial month
/// can be prorated with a positive daily rate. Every other combination is
/// returned unchanged.
pub fn resolve_effective_policy(
    policy: BillingPolicy,
    daily_rate: Option<Money>,
    extra_days: i64,
) -> BillingPolicy {
    let has_daily_rate = daily_rate.is_some_and(Money::is_positive);
    match policy {
        BillingPolicy::Monthly if has_daily_rate && extra_days > 0 => {
            BillingPolicy::MonthlyWithDaily
        }
        other => other,
    }
}
