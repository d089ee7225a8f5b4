use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

fn default_monthly_label() -> String {
    "monthly".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Free-text policy as stored on the listing; normalized server-side.
    #[serde(default = "default_monthly_label")]
    #[validate(length(max = 64))]
    pub billing_policy: String,
    #[validate(range(min = 0))]
    pub monthly_rate: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub daily_rate: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OverviewQuery {
    #[validate(range(min = 0, max = 90))]
    pub window_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicePath {
    pub invoice_id: i64,
}
