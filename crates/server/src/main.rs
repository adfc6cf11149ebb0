use std::{net::SocketAddr, path::Path as FsPath, sync::Arc};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{EntityKey, EntityType},
    error::{ApiError, ApiException, ErrorDocument},
    protocol::{CollectionDocument, Document, WriteDocument, JSON_API_MEDIA_TYPE},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

mod api;
mod app_state;
mod config;
mod fixtures;

use api::{
    add_failure, clear_failures, create_title, failure_for, find_resource, parse_kind, search,
    set_timing, update_resource, ApiContext, FailureRule, Timing,
};
use app_state::AppState;
use config::load_settings;
use fixtures::{Fixtures, SearchQuery};

const MAX_BODY_BYTES: usize = 1024 * 1024;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorDocument>)>;

/// JSON body served as `application/vnd.api+json`.
struct JsonApi<T>(T);

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, JSON_API_MEDIA_TYPE)],
            Json(self.0),
        )
            .into_response()
    }
}

fn failure(exception: ApiException) -> (StatusCode, Json<ErrorDocument>) {
    let status =
        StatusCode::from_u16(exception.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(exception.into()))
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        failure(ApiException::new(
            400,
            vec![ApiError::new(format!("invalid request body: {e}"))],
        ))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let fixtures = match &settings.fixtures_path {
        Some(path) => Fixtures::load(FsPath::new(path))?,
        None => Fixtures::demo(),
    };
    if fixtures.is_empty() {
        warn!("fixtures are empty, every lookup will answer 404");
    }
    info!(
        resources = fixtures.len(),
        source = settings.fixtures_path.as_deref().unwrap_or("demo"),
        "fixtures loaded"
    );

    let state = AppState {
        api: ApiContext::new(fixtures, settings.response_delay_ms),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "mock eholdings server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/_mock/failures",
            post(http_add_failure).delete(http_clear_failures),
        )
        .route("/_mock/timing", put(http_set_timing))
        .route("/:kind", get(http_search).post(http_create))
        .route("/:kind/:id", get(http_show).put(http_update))
        .route("/:kind/:id/:related", get(http_search_related))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            simulate_backend,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// Applies the configured latency and any matching failure rule to resource routes.
async fn simulate_backend(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path == "/healthz" || path.starts_with("/_mock/") {
        return next.run(request).await;
    }

    let delay = state.api.delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let method = request.method().as_str().to_string();
    if let Some(exception) = failure_for(&state.api, &method, &path).await {
        warn!(%method, %path, status = exception.status, "answering with injected failure");
        return failure(exception).into_response();
    }
    next.run(request).await
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_show(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<JsonApi<Document>> {
    let kind = parse_kind(&kind).map_err(failure)?;
    let document = find_resource(&state.api, &EntityKey::new(kind, id))
        .await
        .map_err(failure)?;
    Ok(JsonApi(document))
}

async fn http_search(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<JsonApi<CollectionDocument>> {
    let kind = parse_kind(&kind).map_err(failure)?;
    let document = search(&state.api, kind, None, &query)
        .await
        .map_err(failure)?;
    Ok(JsonApi(document))
}

async fn http_search_related(
    State(state): State<Arc<AppState>>,
    Path((kind, id, related)): Path<(String, String, String)>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<JsonApi<CollectionDocument>> {
    let parent = EntityKey::new(parse_kind(&kind).map_err(failure)?, id);
    let related = parse_kind(&related).map_err(failure)?;
    let document = search(&state.api, related, Some(&parent), &query)
        .await
        .map_err(failure)?;
    Ok(JsonApi(document))
}

async fn http_update(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<JsonApi<Document>> {
    let key = EntityKey::new(parse_kind(&kind).map_err(failure)?, id);
    let write: WriteDocument = parse_body(&body)?;
    let document = update_resource(&state.api, &key, write)
        .await
        .map_err(failure)?;
    Ok(JsonApi(document))
}

async fn http_create(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    body: Bytes,
) -> ApiResult<JsonApi<Document>> {
    let kind = parse_kind(&kind).map_err(failure)?;
    if kind != EntityType::Titles {
        return Err(failure(ApiException::new(
            405,
            vec![ApiError::new(format!("{kind} cannot be created"))],
        )));
    }
    let write: WriteDocument = parse_body(&body)?;
    let document = create_title(&state.api, write).await.map_err(failure)?;
    Ok(JsonApi(document))
}

async fn http_add_failure(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let rule: FailureRule = parse_body(&body)?;
    add_failure(&state.api, rule).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_clear_failures(State(state): State<Arc<AppState>>) -> StatusCode {
    let cleared = clear_failures(&state.api).await;
    info!(cleared, "failure rules cleared");
    StatusCode::NO_CONTENT
}

async fn http_set_timing(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let timing: Timing = parse_body(&body)?;
    set_timing(&state.api, timing);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
