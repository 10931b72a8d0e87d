//! REST surface over the dispatcher and the store: submit a scrape, poll a
//! task, browse scraped pages, fetch downloaded images.

use crate::persistent::Persistent;
use crate::status::TaskKind;
use crate::{PageRecord, ScrapeError, Storage, TaskDispatcher};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Persistent>,
    pub dispatcher: Arc<TaskDispatcher<Persistent>>,
}

/// A store failure while answering a request. Everything maps to a 500 with
/// a JSON detail body; task failures never travel this path.
struct ApiError(ScrapeError);

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> ApiError {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

pub fn router(state: AppState, media_root: &FsPath) -> Router {
    Router::new()
        .route("/scrape/text", post(scrape_text))
        .route("/scrape/images", post(scrape_images))
        .route("/task/:task_id", get(task_detail))
        .route("/webpages", get(webpage_list))
        .route("/webpages/:id", get(webpage_detail))
        .nest_service("/media", ServeDir::new(media_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ScrapeRequest {
    url: String,
}

#[derive(Debug, Serialize)]
struct ScrapeResponse {
    url: String,
    task_id: Uuid,
    task_url: String,
    status_message: &'static str,
}

async fn submit(
    state: AppState,
    kind: TaskKind,
    request: ScrapeRequest,
) -> Result<(StatusCode, Json<ScrapeResponse>), ApiError> {
    let task_id = state.dispatcher.submit(kind, request.url.clone()).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ScrapeResponse {
            url: request.url,
            task_id,
            task_url: format!("/task/{}", task_id),
            status_message: "download request received for processing",
        }),
    ))
}

async fn scrape_text(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<(StatusCode, Json<ScrapeResponse>), ApiError> {
    submit(state, TaskKind::Text, request).await
}

async fn scrape_images(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<(StatusCode, Json<ScrapeResponse>), ApiError> {
    submit(state, TaskKind::Images, request).await
}

async fn task_detail(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    match state.storage.status_get(task_id).await? {
        Some(payload) => Ok(Json(payload).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Not found." })),
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct Pagination {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Serialize)]
struct PageResponse {
    id: i64,
    url: String,
    text: Option<String>,
    images: Vec<String>,
}

impl PageResponse {
    fn from_record(record: PageRecord) -> PageResponse {
        PageResponse {
            id: record.id,
            url: record.url,
            text: record.text,
            images: record
                .images
                .into_iter()
                .map(|file| format!("/media/{}", file))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PageListResponse {
    count: u32,
    results: Vec<PageResponse>,
}

async fn webpage_list(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PageListResponse>, ApiError> {
    let limit = pagination.limit.unwrap_or(20);
    let offset = pagination.offset.unwrap_or(0);

    let pages = state.storage.page_list(limit, offset).await?;
    let count = state.storage.page_count().await?;
    Ok(Json(PageListResponse {
        count,
        results: pages.into_iter().map(PageResponse::from_record).collect(),
    }))
}

async fn webpage_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    match state.storage.page_get(id).await? {
        Some(record) => Ok(Json(PageResponse::from_record(record)).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Not found." })),
        )
            .into_response()),
    }
}
