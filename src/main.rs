use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lotbook::application::handlers::{
    auth_handler, client_handler, dashboard_handler, investment_handler, transaction_handler,
};
use lotbook::application::services::portfolio_service::PortfolioService;
use lotbook::auth;
use lotbook::config::AppConfig;
use lotbook::persistence::{init_database, DatabaseConfig};
use lotbook::rate_limit::{create_api_limiter, create_credential_limiter, rate_limit_middleware};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lotbook=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Lotbook back-office server starting...");

    let config = AppConfig::from_env();
    let db_config = DatabaseConfig::from_env();
    let pool = init_database(&db_config.url).await?;

    let service = Arc::new(PortfolioService::new(pool, config.session_ttl_days));

    let api_limiter = create_api_limiter(&config.rate_limit);
    let credential_limiter = create_credential_limiter(&config.rate_limit);

    // Everything under /api requires a valid session
    let protected = Router::new()
        .route(
            "/clients",
            get(client_handler::list_clients).post(client_handler::create_client),
        )
        .route(
            "/clients/:id",
            get(client_handler::get_client)
                .patch(client_handler::update_client)
                .delete(client_handler::delete_client),
        )
        .route(
            "/clients/:id/investments",
            get(client_handler::list_client_investments),
        )
        .route(
            "/investments",
            get(investment_handler::list_investments).post(investment_handler::create_investment),
        )
        .route(
            "/investments/:id",
            get(investment_handler::get_investment)
                .patch(investment_handler::update_investment)
                .delete(investment_handler::delete_investment),
        )
        .route(
            "/transactions",
            get(transaction_handler::list_transactions)
                .post(transaction_handler::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(transaction_handler::get_transaction)
                .patch(transaction_handler::update_transaction)
                .delete(transaction_handler::delete_transaction),
        )
        .route("/dashboard", get(dashboard_handler::get_dashboard))
        .route_layer(middleware::from_fn_with_state(
            service.clone(),
            auth::require_auth,
        ));

    // Credential endpoints carry a tighter rate limit
    let credential_routes = Router::new()
        .route("/auth/register", post(auth_handler::register))
        .route("/auth/login", post(auth_handler::login))
        .layer(middleware::from_fn(
            move |request: axum::extract::Request, next: middleware::Next| {
                let limiter = credential_limiter.clone();
                async move { rate_limit_middleware(limiter, request, next).await }
            },
        ));

    let app = Router::new()
        .route(
            "/",
            get(|| async { "Lotbook portfolio back-office is running!" }),
        )
        .route("/health", get(health_check))
        .merge(credential_routes)
        .nest("/api", protected)
        .layer(middleware::from_fn(
            move |request: axum::extract::Request, next: middleware::Next| {
                let limiter = api_limiter.clone();
                async move { rate_limit_middleware(limiter, request, next).await }
            },
        ))
        .layer(RequestBodyLimitLayer::new(config.request_body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    let server = axum::serve(listener, app);

    let shutdown_signal = async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    info!("Server started successfully. Press Ctrl+C to stop.");
    server.with_graceful_shutdown(shutdown_signal).await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Health check endpoint
async fn health_check(
    State(service): State<Arc<PortfolioService>>,
) -> Json<serde_json::Value> {
    let database_ok = service.database_ok().await;

    Json(serde_json::json!({
        "status": "running",
        "database": database_ok,
    }))
}
