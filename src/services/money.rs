use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Whole-unit (or minor-unit) amount. Callers keep the unit consistent across
/// every rate they feed into one calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Divides and rounds half away from zero.
    pub fn div_round(self, divisor: i64) -> Money {
        if divisor == 0 {
            return Money::ZERO;
        }
        let quotient = self.0 / divisor;
        let remainder = self.0 % divisor;
        if remainder.abs() * 2 >= divisor.abs() {
            let step = if (self.0 < 0) == (divisor < 0) { 1 } else { -1 };
            Money(quotient + step)
        } else {
            Money(quotient)
        }
    }

    /// `PHP 12,000`
    pub fn display_with(self, currency: &str) -> String {
        format!("{currency} {}", group_thousands(self.0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&group_thousands(self.0))
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::Money;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(Money::new(6000).div_round(30), Money::new(200));
        assert_eq!(Money::new(6015).div_round(30), Money::new(201));
        assert_eq!(Money::new(6014).div_round(30), Money::new(200));
        assert_eq!(Money::new(-6015).div_round(30), Money::new(-201));
        assert_eq!(Money::new(100).div_round(0), Money::ZERO);
    }

    #[test]
    fn groups_thousands_for_display() {
        assert_eq!(Money::new(0).to_string(), "0");
        assert_eq!(Money::new(999).to_string(), "999");
        assert_eq!(Money::new(12000).to_string(), "12,000");
        assert_eq!(Money::new(-1234567).to_string(), "-1,234,567");
        assert_eq!(Money::new(9000).display_with("PHP"), "PHP 9,000");
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Money::new(i64::MAX).checked_mul(2), None);
        assert_eq!(Money::new(3).checked_mul(4), Some(Money::new(12)));
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);
    }
}
