// Asset Overview - Web Server
// REST API + static dashboard with Axum

use anyhow::Context;
use asset_overview::config::{init_tracing, Config};
use asset_overview::{
    build_overview, get_all_assets, get_recent_visits, record_visit, setup_database, AssetFilter,
    AssetKey, AssetRecord, Overview, RecentAsset,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    recent_limit: usize,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler error: logged, then returned as `{ success: false, error }`.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("{:#}", error),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        } else {
            tracing::warn!(status = %self.status, error = %self.message, "request rejected");
        }

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppState {
    fn with_db<T>(&self, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> Result<T, ApiError> {
        let conn = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        Ok(f(&*conn)?)
    }

    fn load_catalog(&self) -> Result<(Vec<AssetRecord>, Vec<AssetKey>), ApiError> {
        let limit = self.recent_limit;
        self.with_db(|conn| {
            let records = get_all_assets(conn)?;
            let recent = get_recent_visits(conn, limit)?
                .into_iter()
                .map(|visit| visit.key)
                .collect();
            Ok((records, recent))
        })
    }
}

/// Filtered catalog response
#[derive(Serialize)]
struct AssetsResponse {
    filter: AssetFilter,
    description: String,
    total: usize,
    assets: Vec<AssetRecord>,
}

#[derive(Deserialize)]
struct VisitRequest {
    key: AssetKey,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/overview - Greeting, recently visited and the four count sections
async fn get_overview(State(state): State<AppState>) -> Result<Json<ApiResponse<Overview>>, ApiError> {
    let (records, recent) = state.load_catalog()?;
    let overview = build_overview(&records, &recent, &chrono::Local::now(), state.recent_limit)?;

    Ok(Json(ApiResponse::ok(overview)))
}

/// GET /api/assets?owner=..&computeKind=..&group=..&codeLocation=..&q=.. - Filtered catalog
async fn get_assets(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<AssetsResponse>>, ApiError> {
    let filter = AssetFilter::from_query(&params).map_err(ApiError::bad_request)?;
    let (records, _) = state.load_catalog()?;

    let assets: Vec<AssetRecord> = filter.apply(&records).into_iter().cloned().collect();
    tracing::debug!(filter = %filter.describe(), matched = assets.len(), "filtered catalog");

    Ok(Json(ApiResponse::ok(AssetsResponse {
        description: filter.describe(),
        total: records.len(),
        filter,
        assets,
    })))
}

/// GET /api/recent - Recently visited assets still in the catalog
async fn get_recent(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<RecentAsset>>>, ApiError> {
    let (records, recent) = state.load_catalog()?;
    let visited = asset_overview::overview::recently_visited(&records, &recent, state.recent_limit);

    Ok(Json(ApiResponse::ok(visited)))
}

/// POST /api/visits - Record a visit to an asset page
async fn post_visit(
    State(state): State<AppState>,
    Json(request): Json<VisitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AssetKey>>), ApiError> {
    if request.key.path().is_empty() {
        return Err(ApiError::bad_request(anyhow::anyhow!("asset key must not be empty")));
    }

    state.with_db(|conn| record_visit(conn, &request.key))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(request.key))))
}

/// GET / - Serve the dashboard
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /assets, /assets/*key - Serve the catalog page
async fn serve_assets() -> impl IntoResponse {
    Html(include_str!("../web/assets.html"))
}

// ============================================================================
// Router
// ============================================================================

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/overview", get(get_overview))
        .route("/assets", get(get_assets))
        .route("/recent", get(get_recent))
        .route("/visits", post(post_visit))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .route("/assets", get(serve_assets))
        .route("/assets/*key", get(serve_assets))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info,tower_http=info")?;
    let config = Config::from_env()?;

    let conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    setup_database(&conn)?;
    tracing::info!(db = %config.db_path.display(), "catalog store opened");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        recent_limit: config.recent_limit,
    };
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "server listening");
    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/overview", config.bind_addr);
    println!("   UI:  http://{}", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_overview::{insert_assets, AssetDefinition, Owner, RepoAddress};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn create_test_state(with_schema: bool) -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        if with_schema {
            setup_database(&conn).unwrap();
            let orders = AssetRecord::new(
                AssetKey::new(["warehouse", "orders"]),
                Some(AssetDefinition {
                    owners: vec![Owner::team("data")],
                    compute_kind: Some("dbt".to_string()),
                    group_name: Some("marts".to_string()),
                    repository: RepoAddress::new("analytics", "prod"),
                }),
            );
            insert_assets(&conn, &[orders]).unwrap();
        }

        AppState {
            db: Arc::new(Mutex::new(conn)),
            recent_limit: 5,
        }
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_visit_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/visits")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_overview_shape() {
        let (status, body) = send(create_test_state(true), get_request("/api/overview")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total_assets"], 1);
        assert!(body["data"]["greeting"].as_str().unwrap().starts_with("Good "));
        assert_eq!(body["data"]["search_href"], "/assets");

        let sections = body["data"]["sections"].as_array().unwrap();
        let kinds: Vec<&str> = sections.iter().map(|s| s["kind"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["owners", "compute_kinds", "asset_groups", "code_locations"]);
        assert_eq!(sections[0]["items"][0]["label"], "data");
        assert_eq!(sections[0]["items"][0]["count"], 1);
    }

    #[tokio::test]
    async fn test_malformed_group_filter_is_bad_request() {
        let (status, body) = send(create_test_state(true), get_request("/api/assets?group=not-json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Invalid group filter"));
    }

    #[tokio::test]
    async fn test_owner_filter_returns_matching_assets() {
        let (status, body) = send(create_test_state(true), get_request("/api/assets?owner=data")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["assets"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_error_is_internal_error() {
        let (status, body) = send(create_test_state(false), get_request("/api/overview")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_visit_with_empty_key_is_rejected() {
        let (status, body) = send(create_test_state(true), post_visit_request(r#"{"key": []}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "asset key must not be empty");
    }

    #[tokio::test]
    async fn test_visit_shows_up_in_recent() {
        let state = create_test_state(true);

        let (status, _) = send(
            state.clone(),
            post_visit_request(r#"{"key": ["warehouse", "orders"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(state, get_request("/api/recent")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["label"], "warehouse/orders");
        assert_eq!(body["data"][0]["href"], "/assets/warehouse/orders");
    }
}
