use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    error::{BillingError, BillingResult},
    services::{
        billing_policy::{resolve_effective_policy, BillingPolicy},
        money::Money,
        stay_duration::{pluralize, stay_duration, StayDuration},
    },
};

/// Rates published for a room, with the policy already closed into an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomRate {
    pub billing_policy: BillingPolicy,
    pub monthly_rate: Money,
    pub daily_rate: Option<Money>,
}

impl RoomRate {
    pub fn new(
        billing_policy: BillingPolicy,
        monthly_rate: Money,
        daily_rate: Option<Money>,
    ) -> BillingResult<Self> {
        if monthly_rate.is_negative() {
            return Err(BillingError::Validation(
                "Monthly rate cannot be negative.".to_string(),
            ));
        }
        if daily_rate.is_some_and(Money::is_negative) {
            return Err(BillingError::Validation(
                "Daily rate cannot be negative.".to_string(),
            ));
        }
        Ok(Self {
            billing_policy,
            monthly_rate,
            daily_rate,
        })
    }

    /// Ingestion boundary for listings that still carry a free-text policy.
    pub fn from_raw(
        raw_policy: &str,
        monthly_rate: Money,
        daily_rate: Option<Money>,
    ) -> BillingResult<Self> {
        Self::new(BillingPolicy::from_label(raw_policy), monthly_rate, daily_rate)
    }

    /// The published daily rate, or `round(monthly_rate / divisor)` when the
    /// room has none.
    pub fn effective_daily_rate(&self, divisor: i64) -> Money {
        self.daily_rate
            .unwrap_or_else(|| self.monthly_rate.div_round(divisor))
    }
}

/// Total price of a stay under an already-resolved policy.
pub fn stay_cost(
    policy: BillingPolicy,
    monthly_rate: Money,
    daily_rate: Money,
    duration: &StayDuration,
) -> BillingResult<Money> {
    let total = match policy {
        BillingPolicy::MonthlyWithDaily => monthly_rate
            .checked_mul(duration.months)
            .zip(daily_rate.checked_mul(duration.extra_days))
            .and_then(|(months, days)| months.checked_add(days)),
        BillingPolicy::Daily => daily_rate.checked_mul(duration.days),
        BillingPolicy::Monthly => monthly_rate.checked_mul(duration.billed_months_rounded_up()),
    };
    let total = total.ok_or_else(|| {
        BillingError::Validation("Stay total exceeds the supported amount range.".to_string())
    })?;
    if total.is_negative() {
        return Err(BillingError::Validation(
            "Rates must not be negative.".to_string(),
        ));
    }
    Ok(total)
}

/// Price and labels for a single room booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingQuote {
    pub duration: StayDuration,
    pub requested_policy: BillingPolicy,
    pub effective_policy: BillingPolicy,
    pub monthly_rate: Money,
    pub daily_rate: Money,
    pub total_cost: Money,
    pub duration_label: String,
    pub breakdown_line: String,
}

pub fn quote_stay(
    rate: &RoomRate,
    check_in: NaiveDate,
    check_out: NaiveDate,
    daily_rate_divisor: i64,
    currency: &str,
) -> BillingResult<BillingQuote> {
    let duration = stay_duration(check_in, check_out)?;
    let daily_rate = rate.effective_daily_rate(daily_rate_divisor);
    let effective_policy =
        resolve_effective_policy(rate.billing_policy, Some(daily_rate), duration.extra_days);
    let total_cost = stay_cost(effective_policy, rate.monthly_rate, daily_rate, &duration)?;

    Ok(BillingQuote {
        duration,
        requested_policy: rate.billing_policy,
        effective_policy,
        monthly_rate: rate.monthly_rate,
        daily_rate,
        total_cost,
        duration_label: duration.label(),
        breakdown_line: breakdown_line(
            effective_policy,
            rate.monthly_rate,
            daily_rate,
            &duration,
            currency,
        ),
    })
}

fn breakdown_line(
    policy: BillingPolicy,
    monthly_rate: Money,
    daily_rate: Money,
    duration: &StayDuration,
    currency: &str,
) -> String {
    let months_part = |months: i64| {
        format!(
            "{} × {}",
            pluralize(months, "month", "months"),
            monthly_rate.display_with(currency)
        )
    };
    let days_part = |days: i64| {
        format!(
            "{} × {}",
            pluralize(days, "day", "days"),
            daily_rate.display_with(currency)
        )
    };

    match policy {
        BillingPolicy::Monthly => months_part(duration.billed_months_rounded_up()),
        BillingPolicy::Daily => days_part(duration.days),
        BillingPolicy::MonthlyWithDaily => {
            let mut parts = Vec::with_capacity(2);
            if duration.months > 0 {
                parts.push(months_part(duration.months));
            }
            if duration.extra_days > 0 {
                parts.push(days_part(duration.extra_days));
            }
            parts.join(" + ")
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{quote_stay, stay_cost, RoomRate};
    use crate::error::BillingError;
    use crate::services::{
        billing_policy::BillingPolicy, money::Money, stay_duration::StayDuration,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn hybrid_proration_charges_only_extra_days() {
        let rate = RoomRate::from_raw("Monthly", Money::new(6000), Some(Money::new(200))).unwrap();
        let quote = quote_stay(&rate, date(2024, 6, 10), date(2024, 7, 25), 30, "PHP").unwrap();

        assert_eq!(quote.duration.days, 45);
        assert_eq!(quote.duration.months, 1);
        assert_eq!(quote.duration.extra_days, 15);
        assert_eq!(quote.requested_policy, BillingPolicy::Monthly);
        assert_eq!(quote.effective_policy, BillingPolicy::MonthlyWithDaily);
        assert_eq!(quote.total_cost, Money::new(9000));
        assert_eq!(quote.duration_label, "45 days (1 month, 15 days)");
        assert_eq!(quote.breakdown_line, "1 month × PHP 6,000 + 15 days × PHP 200");
    }

    #[test]
    fn pure_daily_policy_multiplies_days() {
        let rate = RoomRate::from_raw("Daily", Money::new(9000), Some(Money::new(300))).unwrap();
        let quote = quote_stay(&rate, date(2024, 6, 1), date(2024, 6, 11), 30, "PHP").unwrap();

        assert_eq!(quote.duration.days, 10);
        assert_eq!(quote.effective_policy, BillingPolicy::Daily);
        assert_eq!(quote.total_cost, Money::new(3000));
        assert_eq!(quote.breakdown_line, "10 days × PHP 300");
    }

    #[test]
    fn zero_daily_rate_keeps_monthly_and_rounds_up() {
        let rate = RoomRate::from_raw("monthly", Money::new(6000), Some(Money::ZERO)).unwrap();
        let quote = quote_stay(&rate, date(2024, 1, 1), date(2024, 2, 10), 30, "PHP").unwrap();

        assert_eq!(quote.duration.days, 40);
        assert_eq!(quote.effective_policy, BillingPolicy::Monthly);
        assert_eq!(quote.total_cost, Money::new(12000));
        assert_eq!(quote.breakdown_line, "2 months × PHP 6,000");
    }

    #[test]
    fn missing_daily_rate_is_derived_from_monthly() {
        let rate = RoomRate::from_raw("Monthly", Money::new(6100), None).unwrap();
        assert_eq!(rate.effective_daily_rate(30), Money::new(203));
        assert_eq!(rate.effective_daily_rate(31), Money::new(197));

        let quote = quote_stay(&rate, date(2024, 6, 10), date(2024, 7, 25), 30, "PHP").unwrap();
        assert_eq!(quote.effective_policy, BillingPolicy::MonthlyWithDaily);
        assert_eq!(quote.total_cost, Money::new(6100 + 15 * 203));
    }

    #[test]
    fn cost_formulas_per_policy() {
        let duration = StayDuration::from_days(45).unwrap();
        let monthly = Money::new(6000);
        let daily = Money::new(250);

        assert_eq!(
            stay_cost(BillingPolicy::MonthlyWithDaily, monthly, daily, &duration).unwrap(),
            Money::new(6000 + 15 * 250)
        );
        assert_eq!(
            stay_cost(BillingPolicy::Daily, monthly, daily, &duration).unwrap(),
            Money::new(45 * 250)
        );
        assert_eq!(
            stay_cost(BillingPolicy::Monthly, monthly, daily, &duration).unwrap(),
            Money::new(2 * 6000)
        );
    }

    #[test]
    fn short_hybrid_stay_has_no_month_component() {
        let rate = RoomRate::new(
            BillingPolicy::MonthlyWithDaily,
            Money::new(6000),
            Some(Money::new(200)),
        )
        .unwrap();
        let quote = quote_stay(&rate, date(2024, 6, 1), date(2024, 6, 4), 30, "PHP").unwrap();
        assert_eq!(quote.total_cost, Money::new(600));
        assert_eq!(quote.breakdown_line, "3 days × PHP 200");
    }

    #[test]
    fn rejects_negative_rates_and_bad_ranges() {
        assert!(matches!(
            RoomRate::from_raw("monthly", Money::new(-1), None),
            Err(BillingError::Validation(_))
        ));
        assert!(matches!(
            RoomRate::from_raw("daily", Money::new(100), Some(Money::new(-5))),
            Err(BillingError::Validation(_))
        ));

        let rate = RoomRate::from_raw("monthly", Money::new(6000), None).unwrap();
        assert!(matches!(
            quote_stay(&rate, date(2024, 6, 10), date(2024, 6, 10), 30, "PHP"),
            Err(BillingError::InvalidRange { .. })
        ));
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let duration = StayDuration::from_days(400).unwrap();
        let result = stay_cost(BillingPolicy::Daily, Money::ZERO, Money::new(i64::MAX), &duration);
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }
}
