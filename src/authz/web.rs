use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::authz::mediator::{Decision, OutcomeClass, PermissionMediator};
use crate::authz::types::{CheckRequest, CheckResponse};

pub fn router(mediator: Arc<PermissionMediator>) -> Router {
    Router::new()
        .route("/v1/check", post(handle_check))
        .route("/healthz", get(health))
        .with_state(mediator)
}

async fn handle_check(
    State(mediator): State<Arc<PermissionMediator>>,
    headers: HeaderMap,
    Json(req): Json<CheckRequest>,
) -> Response {
    mediator
        .check_carrier(&headers, &req.resource, &req.permission)
        .await
        .into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

impl IntoResponse for Decision {
    fn into_response(self) -> Response {
        let class = self.class();
        let status = match class {
            OutcomeClass::Allow => StatusCode::OK,
            OutcomeClass::PermissionDenied => StatusCode::FORBIDDEN,
            OutcomeClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        let message = match self {
            Decision::Allow => None,
            Decision::Deny(d) => Some(d.message().to_string()),
        };
        let body = CheckResponse {
            allowed: self.is_allowed(),
            outcome: class.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
