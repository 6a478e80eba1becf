use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{error_response, ErrorResponse};
use crate::application::services::portfolio_service::PortfolioService;
use crate::persistence::models::UserRecord;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserRecord,
}

/// Create a user account
pub async fn register(
    State(service): State<Arc<PortfolioService>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserRecord>), (StatusCode, Json<ErrorResponse>)> {
    let user = service
        .register(&payload.name, &payload.email, &payload.password)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a session token
pub async fn login(
    State(service): State<Arc<PortfolioService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (user, token) = service
        .login(&payload.email, &payload.password)
        .await
        .map_err(error_response)?;

    Ok(Json(LoginResponse { token, user }))
}
