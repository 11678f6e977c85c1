use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use assistant_shared::{RuleDraft, RulePatch, WorkflowExecution, WorkflowRule, WorkflowTemplate};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::workflows::{TemplateOverrides, TriggerEvent};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecutionQuery {
    pub rule_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ExecutionQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

pub fn workflow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rules", get(list_rules).post(create_rule))
        .route("/rules/:id", get(get_rule).put(update_rule).delete(delete_rule))
        .route("/rules/:id/execute", post(execute_rule))
        .route("/executions", get(list_executions))
        .route("/templates", get(list_templates))
        .route("/templates/:id/instantiate", post(instantiate_template))
        .route("/events", post(process_event))
}

fn parse_rule_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid rule id '{}'", raw)))
}

/// Decode an optional JSON body. Only an empty body falls back to the default;
/// anything else must parse.
fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}

async fn list_rules(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<WorkflowRule>>> {
    Ok(Json(state.store.get_rules().await?))
}

async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<RuleDraft>,
) -> ApiResult<(StatusCode, Json<WorkflowRule>)> {
    let rule = state.store.create_rule(draft).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowRule>> {
    let id = parse_rule_id(&id)?;
    Ok(Json(state.store.get_rule(id).await?))
}

async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<RulePatch>,
) -> ApiResult<Json<WorkflowRule>> {
    let id = parse_rule_id(&id)?;
    Ok(Json(state.store.update_rule(id, patch).await?))
}

async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_rule_id(&id)?;
    state.store.delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn execute_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<WorkflowExecution>> {
    let id = parse_rule_id(&id)?;
    let context: serde_json::Value = optional_json(&body)?;
    Ok(Json(state.store.execute_rule(id, context).await?))
}

async fn list_executions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExecutionQuery>,
) -> ApiResult<Json<PaginatedResponse<WorkflowExecution>>> {
    let mut executions = match query.rule_id {
        Some(rule_id) => state.store.get_executions_for(rule_id).await?,
        None => state.store.get_executions().await?,
    };
    // Newest first
    executions.reverse();

    Ok(Json(PaginatedResponse::from_items(executions, &query.pagination())))
}

async fn list_templates(State(state): State<Arc<AppState>>) -> Json<Vec<WorkflowTemplate>> {
    Json(state.store.get_templates().to_vec())
}

async fn instantiate_template(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<WorkflowRule>)> {
    let overrides: TemplateOverrides = optional_json(&body)?;
    let rule = state.store.create_from_template(&template_id, overrides).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn process_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<TriggerEvent>,
) -> ApiResult<Json<Vec<WorkflowExecution>>> {
    Ok(Json(state.store.process_event(event).await?))
}
