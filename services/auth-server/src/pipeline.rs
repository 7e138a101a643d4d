//! RequestPipeline: the fixed middleware chain ahead of every handler
//!
//! Modelled as a sum type per stage rather than a callback chain: each
//! stage either lets the request through or produces a terminal
//! failure. The `pipeline_entry` entry point runs the stages in the
//! fixed order the design calls for (body parsing, then rate limiting
//! and bearer auth, then route lookup) before handing off to a handler.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use access_control::Attempt;
use auth_router::Params;
use auth_store::User;

use crate::error::AppError;
use crate::route::RouteId;
use crate::state::AppState;

/// The parsed body, whatever its `Content-Type` was.
#[derive(Debug, Clone)]
pub enum BodyValue {
    Json(Value),
    Form(HashMap<String, String>),
    Raw(String),
    Empty,
}

impl BodyValue {
    /// A named field, regardless of whether the body arrived as JSON or form-encoded.
    pub fn field(&self, name: &str) -> Option<String> {
        match self {
            BodyValue::Json(Value::Object(map)) => map.get(name).and_then(|v| v.as_str()).map(str::to_string),
            BodyValue::Form(map) => map.get(name).cloned(),
            _ => None,
        }
    }

    pub fn field_bool(&self, name: &str) -> Option<bool> {
        match self {
            BodyValue::Json(Value::Object(map)) => map.get(name).and_then(Value::as_bool),
            BodyValue::Form(map) => map.get(name).and_then(|v| v.parse().ok()),
            _ => None,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            BodyValue::Json(value) => value,
            BodyValue::Form(map) => serde_json::to_value(map).unwrap_or(Value::Null),
            BodyValue::Raw(text) => Value::String(text),
            BodyValue::Empty => Value::Object(Default::default()),
        }
    }
}

/// Outcome of a pipeline stage that short-circuits the chain with a
/// domain error, rendered the same way as a handler error.
pub struct PipelineOutcome(AppError);

impl PipelineOutcome {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Stage 2: read the whole body for mutating methods and decode per `Content-Type`.
pub async fn parse_body(method: &Method, headers: &HeaderMap, body: Body) -> Result<BodyValue, AppError> {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        return Ok(BodyValue::Empty);
    }

    let bytes = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|e| AppError::Validation(format!("failed to read request body: {e}")))?;
    if bytes.is_empty() {
        return Ok(BodyValue::Empty);
    }

    let content_type = headers.get(axum::http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");

    if content_type.starts_with("application/json") {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Ok(BodyValue::Json(value)),
            Err(_) => Ok(BodyValue::Raw(String::from_utf8_lossy(&bytes).into_owned())),
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let map: HashMap<String, String> = form_urlencoded::parse(&bytes).into_owned().collect();
        Ok(BodyValue::Form(map))
    } else {
        Ok(BodyValue::Raw(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Stage 3a: the first `X-Forwarded-For` hop, or "unknown" absent a peer address.
pub fn client_key(headers: &HeaderMap, peer: &str) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.to_string())
}

/// Stage 3b: rate limit the client, then resolve the bearer token to a user.
pub async fn rate_limit_and_auth(
    state: &AppState,
    headers: &HeaderMap,
    client: &str,
) -> Result<Option<User>, PipelineOutcome> {
    if state.rate_limiter.try_attempt(client).await == Attempt::Exceeded {
        return Err(PipelineOutcome(AppError::RateExceeded));
    }

    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    match state.tokens.auth(&token, &state.directory).await {
        Ok(user) => Ok(Some(user)),
        Err(_) => Ok(None),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Stage 4: route lookup against the compiled `Router`.
pub fn dispatch_route<'a>(state: &'a AppState, method: &Method, path: &str) -> Option<(&'a RouteId, Params)> {
    state.router.matches(method, path)
}

pub async fn pipeline_entry(state: AppState, peer: String, req: Request<Body>) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let headers = req.headers().clone();

    let body = match parse_body(&method, &headers, req.into_body()).await {
        Ok(body) => body,
        Err(error) => return error.into_response(),
    };

    let client = client_key(&headers, &peer);
    let user = match rate_limit_and_auth(&state, &headers, &client).await {
        Ok(user) => user,
        Err(outcome) => return outcome.into_response(),
    };

    let Some((route, params)) = dispatch_route(&state, &method, &path) else {
        return AppError::NotFound("Not Found".to_string()).into_response();
    };

    crate::handlers::handle(&state, &method, *route, params, body, user).await.unwrap_or_else(|e| e.into_response())
}
