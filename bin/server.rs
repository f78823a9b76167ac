// SimpleFIN Reconcile - Read API Server
// Serves the reconciled store to downstream ledger tooling (read-only).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use simplefin_reconcile::{Account, Config, Holding, NaturalKey, ReconciliationStore, Transaction};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<ReconciliationStore>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Account response (store key + balances)
#[derive(Serialize)]
struct AccountResponse {
    key: String,
    organization_key: Option<String>,
    source_id: String,
    name: String,
    currency: String,
    balance: String,
    available_balance: Option<String>,
    balance_date: i64,
}

impl AccountResponse {
    fn new(key: NaturalKey, organization_key: Option<NaturalKey>, account: Account) -> Self {
        Self {
            key: key.to_string(),
            organization_key: organization_key.map(|k| k.to_string()),
            source_id: account.source_id,
            name: account.name,
            currency: account.currency,
            balance: account.balance.to_string(),
            available_balance: account.available_balance.map(|b| b.to_string()),
            balance_date: account.balance_date,
        }
    }
}

#[derive(Deserialize)]
struct SinceQuery {
    since: Option<i64>,
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> axum::response::Response {
    error!("{}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::failure(err.to_string())),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/accounts - All reconciled accounts
async fn get_accounts(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_accounts() {
        Ok(accounts) => {
            let response: Vec<AccountResponse> = accounts
                .into_iter()
                .map(|a| AccountResponse::new(a.key, a.owner_key, a.value))
                .collect();
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => internal_error("Error listing accounts", e),
    }
}

/// GET /api/accounts/:key/transactions?since=<epoch> - Postings, oldest first
async fn get_account_transactions(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SinceQuery>,
) -> impl IntoResponse {
    let key = NaturalKey::from_stored(key);
    let since = query.since.unwrap_or(i64::MIN);

    match state.store.list_transactions(&key, since) {
        Ok(transactions) => {
            (StatusCode::OK, Json(ApiResponse::<Vec<Transaction>>::ok(transactions))).into_response()
        }
        Err(e) => internal_error("Error listing transactions", e),
    }
}

/// GET /api/accounts/:key/holdings - Positions, oldest first
async fn get_account_holdings(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let key = NaturalKey::from_stored(key);

    match state.store.list_holdings(&key) {
        Ok(holdings) => {
            (StatusCode::OK, Json(ApiResponse::<Vec<Holding>>::ok(holdings))).into_response()
        }
        Err(e) => internal_error("Error listing holdings", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var_os("SIMPLEFIN_RECONCILE_CONFIG") {
        Some(path) => Config::load(std::path::Path::new(&path))?,
        None => Config::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = ReconciliationStore::open(&config.store)?;
    info!("Database opened: {}", store.location());

    // Create shared state
    let state = AppState {
        store: Arc::new(store),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/accounts", get(get_accounts))
        .route("/accounts/:key/transactions", get(get_account_transactions))
        .route("/accounts/:key/holdings", get(get_account_holdings))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = std::env::var("SIMPLEFIN_RECONCILE_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("   API: http://{}/api/accounts", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
