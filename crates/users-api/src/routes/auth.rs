//! Authentication extractor

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{debug, warn};
use users_auth::{bearer_token, AuthUser};

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for the authenticated user (required)
///
/// Reads the bearer token from `X-Forwarded-Authorization` or `Authorization`
/// and validates it; handlers receive the verified identity as an argument.
pub struct RequireAuth(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = bearer_token(&parts.headers).inspect_err(|e| debug!("No usable bearer token: {}", e))?;
        let claims = app_state
            .tokens
            .validate(token)
            .inspect_err(|e| warn!("Rejected token: {}", e))?;
        let user = AuthUser::from_claims(&claims);

        debug!("Authenticated user: {}", user.username);
        Ok(RequireAuth(user))
    }
}
