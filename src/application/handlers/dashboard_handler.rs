use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use super::{error_response, ErrorResponse};
use crate::application::services::portfolio_service::{DashboardSummary, PortfolioService};
use crate::auth::AuthUser;

/// Aggregated portfolio overview for the caller
pub async fn get_dashboard(
    State(service): State<Arc<PortfolioService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardSummary>, (StatusCode, Json<ErrorResponse>)> {
    let summary = service
        .dashboard_summary(&user.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(summary))
}
