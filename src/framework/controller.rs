//! # Generic HTTP Controller
//!
//! Decode, dispatch, encode. One set of axum handlers serves any resource:
//!
//! | Method   | Path          | Success                  |
//! |----------|---------------|--------------------------|
//! | `POST`   | `{base}`      | `201`, empty body        |
//! | `GET`    | `{base}/:id`  | `200`, DTO               |
//! | `PATCH`  | `{base}`      | `200`, empty body        |
//! | `DELETE` | `{base}/:id`  | `200`, empty body        |
//! | `GET`    | `{base}?q=..` | `200`, JSON array of DTO |
//!
//! Failures are written as `{"error": "<message>"}` with the status from
//! [`ResourceError::status_code`]. Malformed bodies and query terms are `400`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, instrument, warn};

use super::context::RequestContext;
use super::error::ResourceError;
use super::query::parse_terms;
use super::resource::{Mapper, Validator};
use super::service::Service;
use crate::store::DocumentStore;

/// Shared handler state: the service plus the per-request store deadline.
pub struct ControllerState<R: Mapper + Validator, S> {
    service: Arc<Service<R, S>>,
    request_timeout: Duration,
}

impl<R: Mapper + Validator, S> Clone for ControllerState<R, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<R: Mapper + Validator, S> ControllerState<R, S> {
    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

/// Build the axum `Router` for one resource mounted at `base` (e.g. `/api/v1/user`).
pub fn router<R, S>(base: &str, service: Arc<Service<R, S>>, request_timeout: Duration) -> Router
where
    R: Mapper + Validator,
    S: DocumentStore,
{
    let state = ControllerState {
        service,
        request_timeout,
    };

    Router::new()
        .route(
            base,
            get(search::<R, S>)
                .post(create::<R, S>)
                .patch(update::<R, S>),
        )
        .route(
            &format!("{}/:id", base),
            get(read::<R, S>).delete(delete::<R, S>),
        )
        .with_state(state)
}

/// Uniform error body writer.
pub fn error_response(status: StatusCode, err: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn failure(err: &ResourceError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Request rejected");
    }
    error_response(status, err)
}

fn bad_body(rejection: JsonRejection) -> Response {
    failure(&ResourceError::Decode(rejection.body_text()))
}

#[instrument(skip_all, fields(resource = R::NAME))]
async fn create<R, S>(
    State(state): State<ControllerState<R, S>>,
    body: Result<Json<R::Dto>, JsonRejection>,
) -> Response
where
    R: Mapper + Validator,
    S: DocumentStore,
{
    let Json(dto) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    let model = R::to_model(dto);
    match state.service.create(&state.context(), model).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => failure(&e),
    }
}

#[instrument(skip_all, fields(resource = R::NAME))]
async fn read<R, S>(State(state): State<ControllerState<R, S>>, Path(id): Path<String>) -> Response
where
    R: Mapper + Validator,
    S: DocumentStore,
{
    match state.service.read(&state.context(), &id).await {
        Ok(model) => (StatusCode::OK, Json(R::to_dto(model))).into_response(),
        Err(e) => failure(&e),
    }
}

#[instrument(skip_all, fields(resource = R::NAME))]
async fn update<R, S>(
    State(state): State<ControllerState<R, S>>,
    body: Result<Json<R::Dto>, JsonRejection>,
) -> Response
where
    R: Mapper + Validator,
    S: DocumentStore,
{
    let Json(dto) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    let update = R::to_update(dto);
    match state.service.update(&state.context(), update).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => failure(&e),
    }
}

#[instrument(skip_all, fields(resource = R::NAME))]
async fn delete<R, S>(State(state): State<ControllerState<R, S>>, Path(id): Path<String>) -> Response
where
    R: Mapper + Validator,
    S: DocumentStore,
{
    match state.service.delete(&state.context(), &id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => failure(&e),
    }
}

/// `GET {base}?q=key,operator,value&q=...`
#[instrument(skip_all, fields(resource = R::NAME))]
async fn search<R, S>(
    State(state): State<ControllerState<R, S>>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response
where
    R: Mapper + Validator,
    S: DocumentStore,
{
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return failure(&ResourceError::Decode(rejection.body_text())),
    };

    let terms = params
        .iter()
        .filter(|(name, _)| name == "q")
        .map(|(_, term)| term.as_str());
    let predicates = match parse_terms(terms) {
        Ok(predicates) => predicates,
        Err(e) => return failure(&e),
    };

    match state.service.search(&state.context(), predicates).await {
        Ok(models) => {
            let dtos: Vec<R::Dto> = models.into_iter().map(R::to_dto).collect();
            (StatusCode::OK, Json(dtos)).into_response()
        }
        Err(e) => failure(&e),
    }
}
