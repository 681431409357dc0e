//! Bearer-token caller extraction

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use hcat_common::auth::parse_bearer;
use hcat_common::models::Identity;
use hcat_common::Error;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller; rejects with 401 when absent or unknown
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    /// Fail 403 unless the caller is a curator
    pub fn require_curator(&self) -> Result<&Identity, ApiError> {
        if self.0.is_curator() {
            Ok(&self.0)
        } else {
            Err(Error::Forbidden(format!(
                "role '{}' may not access moderation data",
                self.0.role.as_str()
            ))
            .into())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("missing Authorization header".to_string()))?;

        let token = parse_bearer(header)
            .ok_or_else(|| Error::Unauthorized("expected a Bearer credential".to_string()))?;

        let identity = state.auth.resolve(token).await?;
        debug!(user_id = %identity.user_id, role = identity.role.as_str(), "Caller authenticated");

        Ok(AuthUser(identity))
    }
}
