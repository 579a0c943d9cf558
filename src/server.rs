// 🌐 REST API with Axum
// Uploads are never stored: every request carries the file bytes and gets
// its answer computed from them.

use crate::analysis::{analysis_catalog, run_analysis, AnalysisContext, AnalysisRequest, AnalysisType};
use crate::charts::Chart;
use crate::config::Config;
use crate::error::IngestError;
use crate::geo::ZipLookup;
use crate::ledger::{parse_upload, TransactionTable};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Header carrying a percent-encoded filename, for clients that cannot put it in the query.
pub const FILENAME_HEADER: &str = "x-filename";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub zips: Arc<ZipLookup>,
    pub training: Option<Arc<TransactionTable>>,
}

impl AppState {
    pub fn new(config: Config, zips: ZipLookup, training: Option<TransactionTable>) -> Self {
        Self {
            config: Arc::new(config),
            zips: Arc::new(zips),
            training: training.map(Arc::new),
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub filename: String,
    pub analysis: String,
    pub charts: Vec<Chart>,
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    filename: Option<String>,
    analysis: Option<String>,
    ranked: Option<usize>,
    zipcode: Option<String>,
}

fn bad_request<T: Serialize>(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::<T>::err(message))).into_response()
}

/// Query parameter first, then the encoded header, then a placeholder.
fn resolve_filename(query: Option<String>, headers: &HeaderMap) -> String {
    if let Some(name) = query.filter(|n| !n.trim().is_empty()) {
        return name;
    }
    headers
        .get(FILENAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "upload.csv".to_string())
}

fn ingest(filename: &str, body: &[u8]) -> Result<TransactionTable, IngestError> {
    parse_upload(filename, body).map_err(|e| {
        tracing::warn!(filename, error = %e, "upload rejected");
        e
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/analyses - Dropdown entries
async fn list_analyses() -> impl IntoResponse {
    Json(ApiResponse::ok(analysis_catalog()))
}

/// POST /api/upload - Parse the body and return a preview
async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let filename = resolve_filename(params.filename, &headers);

    match ingest(&filename, &body) {
        Ok(table) => {
            let preview = table.preview(state.config.ingest.page_size);
            (StatusCode::OK, Json(ApiResponse::ok(preview))).into_response()
        }
        Err(e) => bad_request::<()>(e.user_message()),
    }
}

/// POST /api/analyze - Parse the body and run one analysis over it
async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let filename = resolve_filename(params.filename, &headers);

    let analysis = match params.analysis.as_deref().unwrap_or("All").parse::<AnalysisType>() {
        Ok(a) => a,
        Err(e) => return bad_request::<()>(e.to_string()),
    };
    let request = AnalysisRequest {
        analysis,
        ranked: params.ranked.unwrap_or(state.config.analysis.ranked),
        zipcode: params.zipcode,
    };

    let table = match ingest(&filename, &body) {
        Ok(table) => table,
        Err(e) => return bad_request::<()>(e.user_message()),
    };

    let ctx = AnalysisContext::new(&state.config, &state.zips, state.training.as_deref());
    match run_analysis(&table, &request, &ctx) {
        Ok(charts) => {
            let response = AnalyzeResponse {
                filename,
                analysis: analysis.name().to_string(),
                charts,
            };
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "analysis rejected");
            bad_request::<()>(e.to_string())
        }
    }
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.ingest.max_upload_bytes;

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/analyses", get(list_analyses))
        .route("/upload", post(upload))
        .route("/analyze", post(analyze))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UPLOAD_ERROR_MESSAGE;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const CSV: &str = "Date,Description,Amount,Address,City/State,Zip Code,Country,Category\n\
01/03/2023,TACO SHACK,$10.00,1 Main St,\"Austin, TX\",78701,United States,Dining\n\
01/10/2023,HEB GROCERY,$90.00,2 Oak St,\"Austin, TX\",78701,United States,Groceries\n\
01/17/2023,TACO SHACK,$20.00,1 Main St,\"Austin, TX\",78701,United States,Dining\n\
02/09/2023,PIZZA PLACE,$30.00,3 Elm St,\"Dallas, TX\",75201,United States,Dining\n\
02/16/2023,PIZZA PLACE,$40.00,3 Elm St,\"Dallas, TX\",75201,United States,Dining\n\
02/23/2023,TACO SHACK,$50.00,1 Main St,\"Austin, TX\",78701,United States,Dining\n";

    fn app() -> Router {
        router(AppState::new(Config::default(), ZipLookup::new(), None))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_csv(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn test_upload_preview() {
        let (status, json) = send(post_csv("/api/upload?filename=march%202023.csv", CSV)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["filename"], "march 2023.csv");
        assert_eq!(json["data"]["total_rows"], 6);
        assert_eq!(json["data"]["rows"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_bad_upload_shows_generic_message() {
        let (status, json) = send(post_csv("/api/upload?filename=bad.csv", "Date,Amount\n1/1/2023,5\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], UPLOAD_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_filename_header_is_decoded() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(FILENAME_HEADER, "d%C3%A9penses.csv")
            .body(Body::from(CSV))
            .unwrap();
        let (_, json) = send(request).await;
        assert_eq!(json["data"]["filename"], "dépenses.csv");
    }

    #[tokio::test]
    async fn test_analyze_bar_chart() {
        let (status, json) = send(post_csv("/api/analyze?filename=m.csv&analysis=Bar%20Chart&ranked=1", CSV)).await;
        assert_eq!(status, StatusCode::OK);
        let charts = json["data"]["charts"].as_array().unwrap();
        assert_eq!(charts.len(), 3);
        assert_eq!(charts[0]["kind"], "bar");
        assert_eq!(charts[0]["bars"][0]["label"], "Dining");
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_ranking() {
        let (status, json) = send(post_csv("/api/analyze?analysis=all&ranked=11", CSV)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "ranked must be between 1 and 10, got 11");
    }

    #[tokio::test]
    async fn test_analyses_catalog() {
        let request = Request::builder().uri("/api/analyses").body(Body::empty()).unwrap();
        let (_, json) = send(request).await;
        let entries = json["data"].as_array().unwrap();
        assert_eq!(entries.len(), 11);
        assert_eq!(entries[0]["name"], "All");
    }
}
