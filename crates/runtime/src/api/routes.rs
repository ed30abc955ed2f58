//! HTTP API route handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};

use super::types::{ErrorResponse, HealthResponse, RootResponse};
use crate::types::{Query, QueryBody, ReflectionError};
use crate::workflow::{ReflectedAnswer, ReflectionMode, ReflectionWorkflow};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn error_response(err: &ReflectionError) -> (StatusCode, Json<ErrorResponse>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err)))
}

async fn handle_chat(
    workflow: Arc<ReflectionWorkflow>,
    body: Result<Json<QueryBody>, JsonRejection>,
    mode: ReflectionMode,
) -> ApiResult<ReflectedAnswer> {
    let Json(body) = body.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(rejection.body_text(), "INVALID_QUERY")),
        )
    })?;

    let query = Query::new(body.query).map_err(|e| error_response(&e))?;

    workflow
        .run(&query, mode)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

/// Answer, then grade the answer with three letter grades
pub async fn chat_with_score(
    State(workflow): State<Arc<ReflectionWorkflow>>,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> ApiResult<ReflectedAnswer> {
    handle_chat(workflow, body, ReflectionMode::Concise).await
}

/// Answer, then reflect with model-written reasons per dimension
pub async fn chat_with_score_reflect_and_reason(
    State(workflow): State<Arc<ReflectionWorkflow>>,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> ApiResult<ReflectedAnswer> {
    handle_chat(workflow, body, ReflectionMode::Reasoning).await
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Hello, World!".to_string(),
    })
}
