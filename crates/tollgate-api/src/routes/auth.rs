//! Authentication extractor and routes

use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    routing::post,
};
use tollgate_auth::IdentityClaim;
use tracing::debug;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

use super::types::{CredentialsRequest, LoginResponse, UserResponse};

// ==================== Auth Extractor ====================

/// Extractor for an authenticated caller (required)
///
/// The token is verified by the session manager, so revoked or superseded
/// tokens are rejected here too.
pub struct RequireAuth(pub IdentityClaim);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::MissingCredentials)?;

        let claim = app_state.sessions.validate(token).await?;

        debug!("Authenticated subject: {}", claim.subject_id);
        Ok(RequireAuth(claim))
    }
}

/// Pull the token out of an Authorization header value
///
/// Accepts `Bearer <token>`, `Bearer<token>` (any case) and a bare token.
pub fn bearer_token(header: &str) -> Option<&str> {
    const SCHEME: &str = "bearer";

    let header = header.trim();
    let token = match header.get(..SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => header[SCHEME.len()..].trim_start(),
        _ => header,
    };

    (!token.is_empty()).then_some(token)
}

// ==================== Auth Routes ====================

/// POST /api/users/signup
async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    debug!("Signup attempt for: {}", request.email);

    let user = state
        .accounts
        .register(&request.email, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/users/login
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    debug!("Login attempt for: {}", request.email);

    let outcome = state
        .sessions
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        token_type: "Bearer",
        expires_in: outcome.expires_in,
    }))
}

/// POST /api/users/logout
async fn logout(
    State(state): State<AppState>,
    RequireAuth(claim): RequireAuth,
) -> Result<StatusCode, ApiError> {
    state.sessions.logout(claim.subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/signup", post(signup))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_forms() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearerabc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("  Bearer   abc  "), Some("abc"));
    }

    #[test]
    fn test_bearer_token_empty() {
        assert_eq!(bearer_token(""), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }

    #[test]
    fn test_bearer_token_short_or_multibyte() {
        assert_eq!(bearer_token("abc"), Some("abc"));
        assert_eq!(bearer_token("ééé"), Some("ééé"));
    }
}
