use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use super::{error_response, ErrorResponse};
use crate::application::services::portfolio_service::{
    ClientDetail, ClientDraft, ClientPatch, PortfolioService,
};
use crate::auth::AuthUser;
use crate::persistence::models::{ClientRecord, InvestmentRecord};

/// List the caller's clients
pub async fn list_clients(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ClientRecord>>, (StatusCode, Json<ErrorResponse>)> {
    let clients = service
        .list_clients(&user.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(clients))
}

/// Create a client
pub async fn create_client(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<ClientDraft>,
) -> Result<(StatusCode, Json<ClientRecord>), (StatusCode, Json<ErrorResponse>)> {
    let client = service
        .create_client(&user.user_id, draft)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(client)))
}

/// Get a client with its investments and transaction history
pub async fn get_client(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ClientDetail>, (StatusCode, Json<ErrorResponse>)> {
    let detail = service
        .client_detail(&user.user_id, &id)
        .await
        .map_err(error_response)?;

    Ok(Json(detail))
}

/// Update a client's editable fields
pub async fn update_client(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(patch): Json<ClientPatch>,
) -> Result<Json<ClientRecord>, (StatusCode, Json<ErrorResponse>)> {
    let client = service
        .update_client(&user.user_id, &id, patch)
        .await
        .map_err(error_response)?;

    Ok(Json(client))
}

/// Delete a client and everything it owns
pub async fn delete_client(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    service
        .delete_client(&user.user_id, &id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

/// List one client's investments
pub async fn list_client_investments(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<InvestmentRecord>>, (StatusCode, Json<ErrorResponse>)> {
    let investments = service
        .list_client_investments(&user.user_id, &id)
        .await
        .map_err(error_response)?;

    Ok(Json(investments))
}
