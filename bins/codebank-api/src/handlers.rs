// HTTP route handlers for the Codebank API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use codebank_common::catalog::ProblemFilter;
use codebank_common::error::BankError;
use codebank_common::types::CaseResult;
use codebank_common::validation::{ProblemDraft, ProblemUpdate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub output: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default, alias = "problem_id")]
    pub problem_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub passed: usize,
    pub total: usize,
    pub score: f64,
    pub max_score: f64,
    pub results: Vec<CaseResult>,
    pub submission_id: Uuid,
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError(BankError::InvalidInput("Invalid problem ID format".to_string())))
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn scrape_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /api/problems
pub async fn list_problems(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<ProblemFilter>,
) -> ApiResult<Json<serde_json::Value>> {
    let problems = state.catalog.list(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "count": problems.len(),
        "data": problems,
    })))
}

/// GET /api/problems/:id
pub async fn get_problem(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let problem = state.catalog.get(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": problem })))
}

/// POST /api/problems
pub async fn create_problem(
    State(state): State<Arc<AppState>>,
    ApiJson(draft): ApiJson<ProblemDraft>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let problem = state.catalog.create(draft).await?;
    info!(problem_id = %problem.problem.id, "Problem created via API");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Problem created successfully",
            "data": problem,
        })),
    ))
}

/// PUT /api/problems/:id
pub async fn update_problem(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProblemUpdate>,
) -> ApiResult<Json<serde_json::Value>> {
    let problem = state.catalog.update(parse_id(&id)?, update).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Problem updated successfully",
        "data": problem,
    })))
}

/// DELETE /api/problems/:id
pub async fn delete_problem(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.catalog.delete(parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Problem deleted successfully",
    })))
}

/// GET /api/problems/:id/submissions
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let submissions = state.catalog.submissions(parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "count": submissions.len(),
        "data": submissions,
    })))
}

/// POST /api/execute - Run code once against a custom input
pub async fn execute_code(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ExecuteRequest>,
) -> ApiResult<Json<ExecuteResponse>> {
    match state
        .grader
        .run(&payload.code, &payload.language, &payload.input)
        .await
    {
        Ok(output) => {
            metrics::record_execution("success");
            Ok(Json(ExecuteResponse { output }))
        }
        Err(e) => {
            metrics::record_execution(&e.error_code().to_lowercase());
            Err(e.into())
        }
    }
}

/// POST /api/submit - Grade code against every test case of a problem
pub async fn submit_solution(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SubmitRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    if payload.problem_id.trim().is_empty() {
        return Err(BankError::InvalidInput("problemId is required".to_string()).into());
    }
    let problem_id = parse_id(&payload.problem_id)?;

    let start = Instant::now();
    let outcome = state
        .grader
        .submit(problem_id, &payload.code, &payload.language)
        .await;
    metrics::GRADING_DURATION.observe(start.elapsed().as_secs_f64());

    match outcome {
        Ok(graded) => {
            metrics::record_submission("recorded");
            info!(
                problem_id = %problem_id,
                submission_id = %graded.submission.id,
                passed = graded.result.passed_count,
                total = graded.result.total_count,
                "Submission graded via API"
            );
            Ok(Json(SubmitResponse {
                passed: graded.result.passed_count,
                total: graded.result.total_count,
                score: graded.result.score_awarded,
                max_score: graded.result.max_score,
                results: graded.result.per_case,
                submission_id: graded.submission.id,
            }))
        }
        Err(e) => {
            metrics::record_submission(&e.error_code().to_lowercase());
            Err(e.into())
        }
    }
}
