pub mod auth_handler;
pub mod client_handler;
pub mod dashboard_handler;
pub mod investment_handler;
pub mod transaction_handler;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::application::services::portfolio_service::PortfolioError;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map a service failure to its HTTP representation. Store and internal
/// failures are logged and reported generically.
pub(crate) fn error_response(err: PortfolioError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match &err {
        PortfolioError::Reconciliation(_) | PortfolioError::InvalidInput(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        PortfolioError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        PortfolioError::Unauthorized | PortfolioError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        PortfolioError::EmailTaken => (StatusCode::CONFLICT, err.to_string()),
        PortfolioError::Database(e) => {
            tracing::error!("Request failed on database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
        PortfolioError::Internal(e) => {
            tracing::error!("Request failed on internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse { error: message }))
}
