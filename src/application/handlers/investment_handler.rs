use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use super::{error_response, ErrorResponse};
use crate::application::services::portfolio_service::{
    InvestmentDetail, InvestmentDraft, InvestmentPatch, PortfolioService,
};
use crate::auth::AuthUser;
use crate::persistence::models::InvestmentRecord;

/// List all of the caller's investments across clients
pub async fn list_investments(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<InvestmentRecord>>, (StatusCode, Json<ErrorResponse>)> {
    let investments = service
        .list_investments(&user.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(investments))
}

/// Create an investment under one of the caller's clients
pub async fn create_investment(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<InvestmentDraft>,
) -> Result<(StatusCode, Json<InvestmentRecord>), (StatusCode, Json<ErrorResponse>)> {
    let investment = service
        .create_investment(&user.user_id, draft)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(investment)))
}

/// Get an investment with its client and transaction history
pub async fn get_investment(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<InvestmentDetail>, (StatusCode, Json<ErrorResponse>)> {
    let detail = service
        .investment_detail(&user.user_id, &id)
        .await
        .map_err(error_response)?;

    Ok(Json(detail))
}

/// Update an investment's directly editable fields (never its quantity)
pub async fn update_investment(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(patch): Json<InvestmentPatch>,
) -> Result<Json<InvestmentRecord>, (StatusCode, Json<ErrorResponse>)> {
    let investment = service
        .update_investment(&user.user_id, &id, patch)
        .await
        .map_err(error_response)?;

    Ok(Json(investment))
}

/// Delete an investment; its transactions cascade
pub async fn delete_investment(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    service
        .delete_investment(&user.user_id, &id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}
