use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use super::{error_response, ErrorResponse};
use crate::application::services::portfolio_service::{
    CommittedTransaction, PortfolioService, TransactionDraft, TransactionPatch,
};
use crate::auth::AuthUser;
use crate::persistence::models::TransactionRecord;

#[derive(Debug, Serialize)]
pub struct DeletedTransactionResponse {
    pub message: String,
    pub investment_quantity: Decimal,
}

/// List the caller's transactions, newest first
pub async fn list_transactions(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<TransactionRecord>>, (StatusCode, Json<ErrorResponse>)> {
    let transactions = service
        .list_transactions(&user.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(transactions))
}

/// Record a transaction; the investment's position is reconciled and
/// committed together with the new row.
pub async fn create_transaction(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<TransactionDraft>,
) -> Result<(StatusCode, Json<CommittedTransaction>), (StatusCode, Json<ErrorResponse>)> {
    let committed = service
        .record_transaction(&user.user_id, draft)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(committed)))
}

/// Get a single transaction
pub async fn get_transaction(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TransactionRecord>, (StatusCode, Json<ErrorResponse>)> {
    let transaction = service
        .transaction_detail(&user.user_id, &id)
        .await
        .map_err(error_response)?;

    Ok(Json(transaction))
}

/// Amend a transaction; the old delta is reversed and the new one applied
/// in a single reconciliation.
pub async fn update_transaction(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(patch): Json<TransactionPatch>,
) -> Result<Json<CommittedTransaction>, (StatusCode, Json<ErrorResponse>)> {
    let committed = service
        .amend_transaction(&user.user_id, &id, patch)
        .await
        .map_err(error_response)?;

    Ok(Json(committed))
}

/// Delete a transaction, reversing its effect on the position
pub async fn delete_transaction(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeletedTransactionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let investment_quantity = service
        .remove_transaction(&user.user_id, &id)
        .await
        .map_err(error_response)?;

    Ok(Json(DeletedTransactionResponse {
        message: "Transaction deleted successfully".to_string(),
        investment_quantity,
    }))
}
