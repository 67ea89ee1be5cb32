//! Mothball API composition root.

#![forbid(unsafe_code)]

mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use mothball_application::{DecommissionService, TokenCredential};
use mothball_core::AppError;
use mothball_infrastructure::{
    ArmComputeLifecycle, ArmResourceManager, AzureClientCredential, AzureTableStore,
};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let tenant_id = required_env("AZURE_TENANT_ID")?;
    let client_id = required_env("AZURE_CLIENT_ID")?;
    let client_secret = required_env("AZURE_CLIENT_SECRET")?;
    let table_endpoint = required_env("STORAGE_TABLE_ENDPOINT")?;
    let function_key = required_env("API_FUNCTION_KEY")?;

    let table_name = env::var("AUDIT_TABLE_NAME").unwrap_or_else(|_| "vmremoval".to_owned());
    let arm_endpoint =
        env::var("ARM_ENDPOINT").unwrap_or_else(|_| "https://management.azure.com".to_owned());
    let aad_endpoint = env::var("AAD_ENDPOINT")
        .unwrap_or_else(|_| "https://login.microsoftonline.com".to_owned());

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    for (name, value) in [
        ("STORAGE_TABLE_ENDPOINT", table_endpoint.as_str()),
        ("ARM_ENDPOINT", arm_endpoint.as_str()),
        ("AAD_ENDPOINT", aad_endpoint.as_str()),
    ] {
        Url::parse(value).map_err(|error| {
            AppError::Configuration(format!("invalid {name} '{value}': {error}"))
        })?;
    }

    let http_client = reqwest::Client::new();
    let credential: Arc<dyn TokenCredential> = Arc::new(AzureClientCredential::new(
        http_client.clone(),
        &aad_endpoint,
        &tenant_id,
        client_id,
        client_secret,
    ));

    let decommission_service = DecommissionService::new(
        Arc::new(ArmResourceManager::new(
            http_client.clone(),
            credential.clone(),
            &arm_endpoint,
        )),
        Arc::new(ArmComputeLifecycle::new(
            http_client.clone(),
            credential.clone(),
            &arm_endpoint,
        )),
        Arc::new(AzureTableStore::new(
            http_client,
            credential,
            &table_endpoint,
            table_name,
        )),
    );

    let app_state = AppState {
        decommission_service,
        function_key,
    };

    let protected_routes = Router::new()
        .route(
            "/api/mark-for-removal",
            post(handlers::decommission::mark_for_removal_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_function_key,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host).map_err(|error| {
        AppError::Configuration(format!("invalid API_HOST '{api_host}': {error}"))
    })?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "mothball-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Configuration(format!("{name} is required")))
}
