//! User profile and address routes
//!
//! Every route requires a token, and the account service checks that the
//! caller owns the path user (and, for a single address, the address itself).

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use tollgate_db::AddressFields;
use tracing::debug;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

use super::auth::RequireAuth;
use super::types::{AddressResponse, UpdateProfileRequest, UserResponse};

// ==================== Profile Routes ====================

/// GET /api/users/{id}
async fn get_profile(
    State(state): State<AppState>,
    RequireAuth(claim): RequireAuth,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.accounts.profile(claim.subject_id, id).await?;
    Ok(Json(user.into()))
}

/// PUT /api/users/{id}
async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(claim): RequireAuth,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    debug!("Updating profile of user: {}", id);

    let user = state
        .accounts
        .update_profile(claim.subject_id, id, &request.first_name, &request.last_name)
        .await?;
    Ok(Json(user.into()))
}

// ==================== Address Routes ====================

/// GET /api/users/{id}/addresses
async fn list_addresses(
    State(state): State<AppState>,
    RequireAuth(claim): RequireAuth,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<AddressResponse>>, ApiError> {
    let addresses = state.accounts.list_addresses(claim.subject_id, id).await?;
    Ok(Json(addresses.into_iter().map(Into::into).collect()))
}

/// POST /api/users/{id}/addresses
async fn add_address(
    State(state): State<AppState>,
    RequireAuth(claim): RequireAuth,
    ApiPath(id): ApiPath<i64>,
    ApiJson(fields): ApiJson<AddressFields>,
) -> Result<(StatusCode, Json<AddressResponse>), ApiError> {
    let address = state
        .accounts
        .add_address(claim.subject_id, id, fields)
        .await?;
    Ok((StatusCode::CREATED, Json(address.into())))
}

/// PUT /api/users/{id}/addresses/{address_id}
async fn update_address(
    State(state): State<AppState>,
    RequireAuth(claim): RequireAuth,
    ApiPath((id, address_id)): ApiPath<(i64, i64)>,
    ApiJson(fields): ApiJson<AddressFields>,
) -> Result<Json<AddressResponse>, ApiError> {
    let address = state
        .accounts
        .update_address(claim.subject_id, id, address_id, fields)
        .await?;
    Ok(Json(address.into()))
}

/// DELETE /api/users/{id}/addresses/{address_id}
async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(claim): RequireAuth,
    ApiPath((id, address_id)): ApiPath<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .accounts
        .delete_address(claim.subject_id, id, address_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/{id}", get(get_profile).put(update_profile))
        .route(
            "/api/users/{id}/addresses",
            get(list_addresses).post(add_address),
        )
        .route(
            "/api/users/{id}/addresses/{address_id}",
            put(update_address).delete(delete_address),
        )
}
