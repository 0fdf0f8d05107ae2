use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use crawler::{IndexingError, Orchestrator};
use search_core::response::{ApiResponse, Done, StatisticsBody};
use search_core::search::{search, SearchRequest, SearchResults, DEFAULT_LIMIT};
use search_core::stats::statistics;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { DEFAULT_LIMIT }

#[derive(Debug, Deserialize)]
pub struct IndexPageForm {
    #[serde(default)]
    pub url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(value: T) -> Reply<T> {
    (StatusCode::OK, Json(ApiResponse::Success(value)))
}

fn fail<T>(status: StatusCode, message: impl ToString) -> Reply<T> {
    (status, Json(ApiResponse::failure(message.to_string())))
}

fn indexing_status(e: &IndexingError) -> StatusCode {
    if e.is_user_error() {
        StatusCode::BAD_REQUEST
    } else if e.is_conflict() {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn indexing_reply(result: Result<(), IndexingError>) -> Reply<Done> {
    match result {
        Ok(()) => ok(Done {}),
        Err(e) => {
            let status = indexing_status(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "indexing request failed");
            } else {
                tracing::info!(error = %e, "indexing request refused");
            }
            fail(status, e)
        }
    }
}

fn cors_layer() -> CorsLayer {
    // CORS_ALLOW_ORIGIN is comma-separated; any origin when unset or empty
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_app(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/search", get(search_handler))
        .route("/api/statistics", get(statistics_handler))
        .route("/api/startIndexing", get(start_indexing))
        .route("/api/stopIndexing", get(stop_indexing))
        .route("/api/indexPage", post(index_page))
        .with_state(AppState { orchestrator })
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Reply<SearchResults> {
    let request = SearchRequest {
        query: params.query,
        site: params.site,
        offset: params.offset,
        limit: params.limit,
    };
    let start = std::time::Instant::now();
    match search(state.orchestrator.store().as_ref(), &request) {
        Ok(results) => {
            tracing::debug!(query = %request.query, count = results.count, took_s = start.elapsed().as_secs_f64(), "search");
            ok(results)
        }
        Err(e) if e.is_user_error() => fail(StatusCode::BAD_REQUEST, e),
        Err(e) => {
            tracing::error!(error = %e, "search failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

pub async fn statistics_handler(State(state): State<AppState>) -> Reply<StatisticsBody> {
    match statistics(state.orchestrator.store().as_ref()) {
        Ok(statistics) => ok(StatisticsBody { statistics }),
        Err(e) => {
            tracing::error!(error = %e, "statistics failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

pub async fn start_indexing(State(state): State<AppState>) -> Reply<Done> {
    indexing_reply(state.orchestrator.start_indexing())
}

pub async fn stop_indexing(State(state): State<AppState>) -> Reply<Done> {
    indexing_reply(state.orchestrator.stop_indexing().await)
}

pub async fn index_page(State(state): State<AppState>, Form(form): Form<IndexPageForm>) -> Reply<Done> {
    indexing_reply(state.orchestrator.index_page(&form.url))
}
