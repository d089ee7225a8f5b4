use axum::http::{header::AUTHORIZATION, HeaderMap};
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult, BillingError};

/// Caller credential forwarded to the booking and payment collaborators.
/// Verification happens upstream; this service only passes it through.
///
/// `scope` partitions per-caller state such as the notification seen-set.
/// It defaults to a digest of the credential, so the raw token is never
/// used as a storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    pub access_token: String,
    pub scope: String,
}

impl OwnerContext {
    pub fn new(access_token: impl Into<String>) -> Self {
        let access_token = access_token.into();
        let scope = credential_scope(&access_token);
        Self {
            access_token,
            scope,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

fn credential_scope(access_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(access_token.as_bytes());
    let hash = hasher.finalize();
    hash[..8].iter().map(|b| format!("{b:02x}")).collect()
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

pub fn require_owner_context(headers: &HeaderMap) -> AppResult<OwnerContext> {
    bearer_token(headers).map(OwnerContext::new).ok_or_else(|| {
        AppError::from(BillingError::Auth(
            "Missing bearer credential. Sign in again.".to_string(),
        ))
    })
}
