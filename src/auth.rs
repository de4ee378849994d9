use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::VaultError;

/// Explicit per-request session, extracted from the bearer token.
///
/// Token verification belongs to the identity provider in front of this
/// service; by the time a request reaches us the token's verified subject
/// is the user id. There is deliberately no ambient/global session state -
/// handlers receive this value and pass it down by reference.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

impl Session {
    pub fn from_bearer(header: &str) -> Result<Self, VaultError> {
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                VaultError::Unauthorized("Expected 'Authorization: Bearer <token>'".to_string())
            })?;

        Ok(Self {
            user_id: token.to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = VaultError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| VaultError::Unauthorized("Missing Authorization header".to_string()))?;

        Session::from_bearer(header)
    }
}
