use std::future::Future;

use crate::error::BillingError;

/// Outcome of one branch of a concurrent gather. A rejected branch never
/// cancels or fails its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(BillingError),
}

impl<T> Settled<T> {
    pub fn auth_error(&self) -> Option<&BillingError> {
        match self {
            Self::Rejected(error) if error.is_auth() => Some(error),
            _ => None,
        }
    }

    /// Value of a fulfilled branch, or `T::default()` for a rejected one.
    /// Rejected bucket names are appended to `degraded`.
    pub fn or_degrade(self, bucket: &'static str, degraded: &mut Vec<&'static str>) -> T
    where
        T: Default,
    {
        match self {
            Self::Fulfilled(value) => value,
            Self::Rejected(error) => {
                tracing::warn!(bucket, error = %error, "Degrading bucket to empty");
                degraded.push(bucket);
                T::default()
            }
        }
    }
}

impl<T> From<Result<T, BillingError>> for Settled<T> {
    fn from(result: Result<T, BillingError>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(error) => Self::Rejected(error),
        }
    }
}

/// Awaits a fallible future and records its outcome instead of propagating it.
pub async fn settle<T, F>(future: F) -> Settled<T>
where
    F: Future<Output = Result<T, BillingError>>,
{
    Settled::from(future.await)
}
