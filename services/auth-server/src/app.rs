//! Axum wiring: turns the compiled `auth_router::Router` + `RequestPipeline`
//! into a `tower`-compatible service, plus the response-wide enhancements
//! (`X-Server-ID`) that sit outside the pipeline proper.

use std::net::SocketAddr;

use axum::Router as AxumRouter;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request};
use axum::response::Response;
use tower_http::trace::TraceLayer;

use crate::pipeline;
use crate::state::AppState;

const SERVER_ID_HEADER: &str = "x-server-id";

pub fn build(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every registered route and the 404/429/500 fallthroughs all land here;
/// `auth_router::Router` does the real method+path dispatch inside the pipeline.
async fn dispatch(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> Response {
    let server_id = state.server_id.clone();
    let mut response = pipeline::pipeline_entry(state, peer.ip().to_string(), req).await;
    if let Ok(value) = HeaderValue::from_str(&server_id) {
        response.headers_mut().insert(SERVER_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use access_control::{AccessEvaluator, RateLimiter};
    use auth_store::{KeyedLocks, RotationRegistry, Store, TokenStore, UserDirectory};

    use crate::config::Config;
    use crate::port::PortSpec;
    use crate::route;

    use super::*;

    async fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path().to_path_buf()));
        let directory = Arc::new(UserDirectory::new(store.clone()));
        let tokens = Arc::new(TokenStore::boot(store.clone()).await.unwrap());
        let rotation = Arc::new(RotationRegistry::boot(store.clone()).await.unwrap());
        let evaluator = Arc::new(AccessEvaluator::new(store.clone(), directory.clone()));
        let config = Arc::new(Config {
            port: PortSpec::Single(0),
            data_dir: dir.path().to_path_buf(),
            reset_clears_tokens: true,
            rate_limit_max_attempts: 1_000,
            rate_limit_window_ms: 1_000,
        });
        let state = AppState {
            store,
            directory,
            tokens,
            rotation,
            evaluator,
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_max_attempts, config.rate_limit_window_ms)),
            locks: Arc::new(KeyedLocks::new()),
            router: Arc::new(route::build()),
            config,
            server_id: "test-server".to_string(),
        };
        (dir, state)
    }

    fn request(method: &str, uri: &str, body: Value) -> Request<Body> {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        req.extensions_mut().insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));
        req
    }

    fn bearer(req: Request<Body>, token: &str) -> Request<Body> {
        let (mut parts, body) = req.into_parts();
        parts.headers.insert("authorization", format!("Bearer {token}").parse().unwrap());
        Request::from_parts(parts, body)
    }

    async fn call(app: &AxumRouter, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    use serde_json::{json, Value};

    #[tokio::test]
    async fn full_signup_verify_signin_private_flow() {
        let (_dir, state) = test_state().await;
        state.store.save_text(".access", "* rwd /\n").await.unwrap();
        let app = build(state.clone());

        let (status, _) = call(
            &app,
            request("POST", "/auth/signup", json!({"username": "alice", "email": "a@x.com", "password": "p"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let user = state.directory.get_user("alice").await.unwrap();
        let code = user.verification_code.clone().unwrap();

        let (status, body) =
            call(&app, request("PUT", "/auth/signup/alice", json!({ "code": code }))).await;
        assert_eq!(status, StatusCode::OK);
        let access_token = body["accessToken"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            bearer(request("POST", "/private/notes.json", json!({"t": 1})), &access_token),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            call(&app, bearer(request("GET", "/private/notes.json", Value::Null), &access_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["t"], 1);

        let (status, _) =
            call(&app, bearer(request("DELETE", "/auth/signin/alice", Value::Null), &access_token)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            call(&app, bearer(request("GET", "/private/notes.json", Value::Null), &access_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_signup_is_conflict() {
        let (_dir, state) = test_state().await;
        let app = build(state.clone());
        call(&app, request("POST", "/auth/signup", json!({"username": "bob", "email": "b@x.com", "password": "p"})))
            .await;
        let (status, body) = call(
            &app,
            request("POST", "/auth/signup", json!({"username": "bob", "email": "b@x.com", "password": "p"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "User already exists");
    }

    #[tokio::test]
    async fn refresh_rotation_revokes_on_replace() {
        let (_dir, state) = test_state().await;
        let app = build(state.clone());
        call(
            &app,
            request("POST", "/auth/signup", json!({"username": "carol", "email": "c@x.com", "password": "p"})),
        )
        .await;
        let user = state.directory.get_user("carol").await.unwrap();
        let code = user.verification_code.clone().unwrap();
        let (_, verify_body) = call(&app, request("PUT", "/auth/signup/carol", json!({ "code": code }))).await;
        let refresh_token = verify_body["refreshToken"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            request("PUT", &format!("/auth/refresh/{refresh_token}"), json!({ "replace": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["refreshToken"].as_str().unwrap() != refresh_token);

        let (status, _) =
            call(&app, request("PUT", &format!("/auth/refresh/{refresh_token}"), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rate_limit_returns_429_after_max_attempts() {
        let (_dir, mut state) = test_state().await;
        state.rate_limiter = Arc::new(RateLimiter::new(1, 1_000));
        let app = build(state);

        let (status, _) = call(&app, request("GET", "/auth/access/info", Value::Null)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&app, request("GET", "/auth/access/info", Value::Null)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Too many requests");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (_dir, state) = test_state().await;
        let app = build(state);
        let (status, _) = call(&app, request("GET", "/nope", Value::Null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
