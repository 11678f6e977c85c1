use assistant_shared::WorkflowAction;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::executor::{ActionDispatcher, DispatchError, ExecutionContext};
use crate::workflows::{MemoryRepository, WorkflowRuleStore};
use crate::{build_router, AppState};

/// Rejects every action whose name starts with "fail".
pub struct FailByNameDispatcher;

#[async_trait]
impl ActionDispatcher for FailByNameDispatcher {
    async fn dispatch(
        &self,
        action: &WorkflowAction,
        _context: &ExecutionContext,
    ) -> Result<Value, DispatchError> {
        if action.name.starts_with("fail") {
            Err(DispatchError::Unavailable {
                service: "test".to_string(),
                message: "scripted failure".to_string(),
            })
        } else {
            Ok(serde_json::json!({ "accepted": true }))
        }
    }
}

pub fn failing_store() -> WorkflowRuleStore {
    WorkflowRuleStore::new(Arc::new(MemoryRepository::new()), Arc::new(FailByNameDispatcher))
}

pub fn test_app() -> Router {
    build_router(Arc::new(AppState {
        store: WorkflowRuleStore::in_memory(),
    }))
}

/// Send a request through the router and decode the JSON response body.
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_raw(app, method, uri, body.map(|json| json.to_string())).await
}

/// Like `send`, but the body goes out exactly as written.
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(text) => {
            builder = builder.header("content-type", "application/json");
            Body::from(text)
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, json)
}
