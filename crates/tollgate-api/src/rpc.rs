//! UserService RPC surface
//!
//! JSON over HTTP under `/rpc/UserService/{Method}`. Failures carry a
//! gRPC-style status code in the body and the matching HTTP status.
//! `Authorize` answers for the bearer of the request's token only.

use axum::{
    Json, Router,
    extract::{FromRef, FromRequest, FromRequestParts, State, rejection::JsonRejection},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tollgate_auth::IdentityClaim;
use tollgate_core::{CoreError, Decision};
use tracing::debug;

use crate::routes::auth::bearer_token;
use crate::state::AppState;

// ==================== Status ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcCode {
    InvalidArgument,
    AlreadyExists,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Internal,
}

impl RpcCode {
    fn http_status(self) -> StatusCode {
        match self {
            RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcCode::AlreadyExists => StatusCode::CONFLICT,
            RpcCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            RpcCode::PermissionDenied => StatusCode::FORBIDDEN,
            RpcCode::NotFound => StatusCode::NOT_FOUND,
            RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failed RPC
#[derive(Debug)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    fn invalid_argument(message: &str) -> Self {
        Self {
            code: RpcCode::InvalidArgument,
            message: message.to_string(),
        }
    }

    fn unauthenticated(message: &str) -> Self {
        Self {
            code: RpcCode::Unauthenticated,
            message: message.to_string(),
        }
    }
}

impl From<JsonRejection> for RpcStatus {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            code: RpcCode::InvalidArgument,
            message: rejection.body_text(),
        }
    }
}

impl From<CoreError> for RpcStatus {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InvalidInput(_) => RpcCode::InvalidArgument,
            CoreError::Conflict(_) => RpcCode::AlreadyExists,
            CoreError::InvalidCredentials | CoreError::InvalidToken(_) => RpcCode::Unauthenticated,
            CoreError::Forbidden => RpcCode::PermissionDenied,
            CoreError::NotFound(_) => RpcCode::NotFound,
            CoreError::Internal(_) => RpcCode::Internal,
        };
        let message = match err {
            CoreError::InvalidInput(msg) | CoreError::Conflict(msg) | CoreError::NotFound(msg) => {
                msg
            }
            other => other.to_string(),
        };

        Self { code, message }
    }
}

impl IntoResponse for RpcStatus {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message
        }));
        (self.code.http_status(), body).into_response()
    }
}

// ==================== Extractors ====================

/// Request message extractor; undecodable bodies are `INVALID_ARGUMENT`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(RpcStatus))]
pub struct RpcJson<T>(pub T);

/// Caller identified by the request's bearer token
pub struct RpcCaller(pub IdentityClaim);

impl<S> FromRequestParts<S> for RpcCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RpcStatus;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| RpcStatus::unauthenticated("Authorization header is required"))?;

        let claim = app_state.sessions.validate(token).await?;
        Ok(RpcCaller(claim))
    }
}

// ==================== Messages ====================

#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub user_id: i64,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Serialize, Default)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The subject is always the authenticated caller
#[derive(Deserialize)]
pub struct AuthorizeRequest {
    pub resource_owner_id: i64,
    /// When set, the stored owner of this address is checked as well
    #[serde(default)]
    pub address_id: Option<i64>,
}

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub decision: Decision,
    pub allowed: bool,
}

// ==================== Methods ====================

/// POST /rpc/UserService/CreateUser
async fn create_user(
    State(state): State<AppState>,
    RpcJson(request): RpcJson<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, RpcStatus> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(RpcStatus::invalid_argument("Email and password are required"));
    }

    let user = state
        .accounts
        .register(&request.email, &request.password)
        .await?;

    Ok(Json(CreateUserResponse {
        user_id: user.id,
        email: user.email,
    }))
}

/// POST /rpc/UserService/Login
async fn login(
    State(state): State<AppState>,
    RpcJson(request): RpcJson<LoginRequest>,
) -> Result<Json<LoginResponse>, RpcStatus> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(RpcStatus::invalid_argument("Email and password are required"));
    }

    let outcome = state
        .sessions
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        expires_in: outcome.expires_in,
    }))
}

/// POST /rpc/UserService/ValidateToken
///
/// Any rejected token is reported as `valid: false`; only missing input and
/// internal failures are errors.
async fn validate_token(
    State(state): State<AppState>,
    RpcJson(request): RpcJson<ValidateTokenRequest>,
) -> Result<Json<ValidateTokenResponse>, RpcStatus> {
    if request.token.is_empty() {
        return Err(RpcStatus::invalid_argument("Token is required"));
    }

    match state.sessions.validate(&request.token).await {
        Ok(claim) => Ok(Json(ValidateTokenResponse {
            valid: true,
            user_id: Some(claim.subject_id),
            email: Some(claim.email),
        })),
        Err(CoreError::InvalidToken(fault)) => {
            debug!("ValidateToken rejected token: {}", fault);
            Ok(Json(ValidateTokenResponse::default()))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /rpc/UserService/Authorize
async fn authorize(
    State(state): State<AppState>,
    RpcCaller(caller): RpcCaller,
    RpcJson(request): RpcJson<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, RpcStatus> {
    let subject_id = caller.subject_id;
    let decision = match request.address_id {
        Some(address_id) => {
            state
                .accounts
                .authorize_address(subject_id, request.resource_owner_id, address_id)
                .await?
        }
        None => state
            .accounts
            .guard()
            .authorize(subject_id, request.resource_owner_id),
    };

    Ok(Json(AuthorizeResponse {
        decision,
        allowed: decision.is_allowed(),
    }))
}

/// Create RPC routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/UserService/CreateUser", post(create_user))
        .route("/rpc/UserService/Login", post(login))
        .route("/rpc/UserService/ValidateToken", post(validate_token))
        .route("/rpc/UserService/Authorize", post(authorize))
}
