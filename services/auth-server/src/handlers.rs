//! AuthHandlers: one function per endpoint, composing the services in `AppState`
//!
//! Each handler receives whatever the pipeline has already resolved — parsed
//! body, route params, and the bearer-authenticated user, if any — and is
//! responsible for nothing but the endpoint's own business logic. Storage
//! "not found" is translated to a domain 404 here, never propagated raw.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use access_control::AccessLevel;
use auth_store::User;

use crate::error::AppError;
use crate::pipeline::BodyValue;
use crate::route::RouteId;
use crate::state::AppState;

type Params = auth_router::Params;

pub async fn handle(
    state: &AppState,
    method: &Method,
    route: RouteId,
    params: Params,
    body: BodyValue,
    user: Option<User>,
) -> Result<Response, AppError> {
    match route {
        RouteId::Signup => signup(state, &body).await,
        RouteId::ConfirmSignup => confirm_signup(state, &params, &body).await,
        RouteId::DeleteSignup => delete_account(state, &params).await,
        RouteId::SigninPost => signin(state, &params, &body).await,
        RouteId::SigninGet => get_user(state, &params, user.as_ref()).await,
        RouteId::SigninDelete => signout(state, user.as_ref()).await,
        RouteId::Refresh => refresh(state, &params, &body).await,
        RouteId::ForgotPost => forgot_password(state, &params).await,
        RouteId::ForgotPut => reset_password(state, &params, &body).await,
        RouteId::ListUsers => list_users(state, user.as_ref()).await,
        RouteId::GetUser => get_user(state, &params, user.as_ref()).await,
        RouteId::AccessInfo => access_info(state, user.as_ref()).await,
        RouteId::PrivateRead => private_read(state, &params, method, user.as_ref()).await,
        RouteId::PrivateWrite => private_write(state, &params, &body, user.as_ref()).await,
        RouteId::PrivateDelete => private_delete(state, &params, user.as_ref()).await,
    }
}

fn param<'a>(params: &'a Params, name: &str) -> &'a str {
    params.get(name).map(String::as_str).unwrap_or_default()
}

fn ok_json(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

// ---- Signup / verification ----------------------------------------------

async fn signup(state: &AppState, body: &BodyValue) -> Result<Response, AppError> {
    let username = body.field("username").ok_or_else(|| AppError::Validation("Missing required fields".into()))?;
    let email = body.field("email").ok_or_else(|| AppError::Validation("Missing required fields".into()))?;
    let password = body.field("password").ok_or_else(|| AppError::Validation("Missing required fields".into()))?;

    auth_store::validate_username(&username).map_err(|_| AppError::Validation("Invalid username".into()))?;

    let _guard = state.locks.lock(&username).await;
    if state.directory.user_exists(&username).await {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let now = chrono::Utc::now();
    let user = User {
        name: username,
        email,
        password_hash: auth_store::short_digest(&password),
        verified: false,
        verification_code: Some(auth_store::verification_code()),
        reset_code: None,
        roles: Default::default(),
        created_at: now,
        updated_at: now,
    };
    state.directory.save_user(&user).await?;

    Ok(ok_json(StatusCode::OK, json!({ "message": "Verification code sent" })))
}

async fn confirm_signup(state: &AppState, params: &Params, body: &BodyValue) -> Result<Response, AppError> {
    let username = param(params, "username");
    let _guard = state.locks.lock(username).await;

    let mut user = state.directory.get_user(username).await?;
    if user.verified {
        return Err(AppError::Validation("Already verified".into()));
    }
    let code = body.field("code").unwrap_or_default();
    if user.verification_code.as_deref() != Some(code.as_str()) {
        return Err(AppError::CredentialMismatch("Invalid code".into()));
    }

    user.verified = true;
    user.verification_code = None;
    user.updated_at = chrono::Utc::now();
    state.directory.save_user(&user).await?;

    let pair = state.tokens.mint_pair(&user.name).await?;
    state.rotation.register(&pair.refresh_token, &user.name, None).await?;

    Ok(ok_json(
        StatusCode::OK,
        json!({
            "message": "Account verified",
            "accessToken": pair.access_token,
            "refreshToken": pair.refresh_token,
        }),
    ))
}

async fn delete_account(state: &AppState, params: &Params) -> Result<Response, AppError> {
    let username = param(params, "username");
    let _guard = state.locks.lock(username).await;

    state.directory.get_user(username).await?;
    state.directory.delete_user(username).await?;
    state.tokens.clear_user_tokens(username).await?;
    state.rotation.clear_user_tokens(username).await?;

    Ok(ok_json(StatusCode::OK, json!({ "message": "Account deleted" })))
}

// ---- Signin / signout -----------------------------------------------------

async fn signin(state: &AppState, params: &Params, body: &BodyValue) -> Result<Response, AppError> {
    let username = param(params, "username");
    let _guard = state.locks.lock(username).await;

    let user = state
        .directory
        .get_user(username)
        .await
        .map_err(|_| AppError::NotFound("Invalid password or username".into()))?;

    if !user.verified {
        return Err(AppError::NotVerified);
    }

    let password = body.field("password").unwrap_or_default();
    if user.password_hash != auth_store::short_digest(&password) {
        return Err(AppError::CredentialMismatch("Invalid password or username".into()));
    }

    let pair = state.tokens.mint_pair(&user.name).await?;
    state.rotation.register(&pair.refresh_token, &user.name, None).await?;

    Ok(ok_json(
        StatusCode::OK,
        json!({ "accessToken": pair.access_token, "refreshToken": pair.refresh_token }),
    ))
}

async fn signout(state: &AppState, user: Option<&User>) -> Result<Response, AppError> {
    let user = user.ok_or(AppError::AuthMissing)?;
    state.tokens.clear_user_tokens(&user.name).await?;
    state.rotation.clear_user_tokens(&user.name).await?;
    Ok(ok_json(StatusCode::OK, json!({ "message": "Signed out" })))
}

// ---- Refresh ----------------------------------------------------------------

async fn refresh(state: &AppState, params: &Params, body: &BodyValue) -> Result<Response, AppError> {
    let token = param(params, "token");

    let user = state.tokens.auth(token, &state.directory).await.map_err(|_| AppError::AuthInvalid)?;
    let _guard = state.locks.lock(&user.name).await;

    if !state.rotation.validate(token, &user.name).await {
        return Err(AppError::AuthInvalid);
    }

    let pair = state.tokens.mint_pair(&user.name).await?;
    state.rotation.register(&pair.refresh_token, &user.name, Some(token.to_string())).await?;

    if body.field_bool("replace").unwrap_or(false) {
        let revoked = state.rotation.invalidate_chain(token).await?;
        for old_refresh in revoked {
            state.tokens.remove_token(&old_refresh, &user.name).await?;
        }
    }

    Ok(ok_json(
        StatusCode::OK,
        json!({ "accessToken": pair.access_token, "refreshToken": pair.refresh_token }),
    ))
}

// ---- Password reset -----------------------------------------------------

async fn forgot_password(state: &AppState, params: &Params) -> Result<Response, AppError> {
    let username = param(params, "username");
    let _guard = state.locks.lock(username).await;

    let mut user = state.directory.get_user(username).await?;
    user.reset_code = Some(auth_store::verification_code());
    user.updated_at = chrono::Utc::now();
    state.directory.save_user(&user).await?;

    Ok(ok_json(StatusCode::OK, json!({ "message": "Reset code sent" })))
}

async fn reset_password(state: &AppState, params: &Params, body: &BodyValue) -> Result<Response, AppError> {
    let username = param(params, "username");
    let _guard = state.locks.lock(username).await;

    let mut user = state
        .directory
        .get_user(username)
        .await
        .map_err(|_| AppError::NotFound("Invalid reset code".into()))?;

    let code = body.field("code").unwrap_or_default();
    if user.reset_code.as_deref() != Some(code.as_str()) {
        return Err(AppError::CredentialMismatch("Invalid reset code".into()));
    }

    let password = body.field("password").unwrap_or_default();
    user.password_hash = auth_store::short_digest(&password);
    user.reset_code = None;
    user.updated_at = chrono::Utc::now();
    state.directory.save_user(&user).await?;

    if state.config.reset_clears_tokens {
        state.tokens.clear_user_tokens(&user.name).await?;
        state.rotation.clear_user_tokens(&user.name).await?;
    }

    let pair = state.tokens.mint_pair(&user.name).await?;
    state.rotation.register(&pair.refresh_token, &user.name, None).await?;

    Ok(ok_json(
        StatusCode::OK,
        json!({
            "message": "Password reset",
            "accessToken": pair.access_token,
            "refreshToken": pair.refresh_token,
        }),
    ))
}

// ---- User lookup / listing ------------------------------------------------

async fn list_users(state: &AppState, user: Option<&User>) -> Result<Response, AppError> {
    let user = user.ok_or(AppError::Forbidden)?;
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    let users = state.directory.list_users().await?;
    Ok(ok_json(StatusCode::OK, json!({ "users": users })))
}

async fn get_user(state: &AppState, params: &Params, requester: Option<&User>) -> Result<Response, AppError> {
    let requester = requester.ok_or(AppError::AuthMissing)?;
    let username = param(params, "username");
    let target = state.directory.get_user(username).await?;
    Ok(ok_json(StatusCode::OK, project_user(requester, &target)))
}

/// Admins and the user themselves see everything but password/verification/reset
/// secrets; `isPublic` users (role `public`) show the same to everyone; anyone
/// else sees only `{username, email, createdAt}`.
fn project_user(requester: &User, target: &User) -> Value {
    if requester.is_admin() || requester.name == target.name || target.is_public() {
        json!({
            "username": target.name,
            "email": target.email,
            "verified": target.verified,
            "roles": target.roles,
            "createdAt": target.created_at,
            "updatedAt": target.updated_at,
        })
    } else {
        json!({
            "username": target.name,
            "email": target.email,
            "createdAt": target.created_at,
        })
    }
}

async fn access_info(state: &AppState, user: Option<&User>) -> Result<Response, AppError> {
    let user = user.ok_or(AppError::AuthMissing)?;
    let info = state.evaluator.info(&user.name).await?;
    Ok(ok_json(
        StatusCode::OK,
        json!({
            "userAccess": info.user_access,
            "groupRules": info.group_rules,
            "globalRules": info.global_rules,
            "groups": info.groups,
        }),
    ))
}

// ---- Private resources -----------------------------------------------------

fn private_path(params: &Params) -> std::path::PathBuf {
    std::path::PathBuf::from("private").join(param(params, "*"))
}

async fn private_read(
    state: &AppState,
    params: &Params,
    method: &Method,
    user: Option<&User>,
) -> Result<Response, AppError> {
    let user = user.ok_or(AppError::AuthMissing)?;
    let path = param(params, "*");
    if !state.evaluator.check(&user.name, path, AccessLevel::Read).await? {
        return Err(AppError::Forbidden);
    }

    match state.store.read_raw(private_path(params)).await {
        Ok(_) if *method == Method::HEAD => Ok(StatusCode::OK.into_response()),
        Ok(bytes) => {
            let value: Value = serde_json::from_slice(&bytes).map_err(|e| AppError::Internal(e.to_string()))?;
            Ok(ok_json(StatusCode::OK, value))
        }
        Err(auth_store::Error::NotFound) if *method == Method::HEAD => Ok(StatusCode::NOT_FOUND.into_response()),
        Err(auth_store::Error::NotFound) => Err(AppError::NotFound("Not Found".into())),
        Err(e) => Err(e.into()),
    }
}

async fn private_write(
    state: &AppState,
    params: &Params,
    body: &BodyValue,
    user: Option<&User>,
) -> Result<Response, AppError> {
    let user = user.ok_or(AppError::AuthMissing)?;
    let path = param(params, "*");
    if !state.evaluator.check(&user.name, path, AccessLevel::Write).await? {
        return Err(AppError::Forbidden);
    }

    state.store.save_document(private_path(params), &body.clone().into_json()).await?;
    Ok(ok_json(StatusCode::CREATED, json!({ "success": true })))
}

async fn private_delete(state: &AppState, params: &Params, user: Option<&User>) -> Result<Response, AppError> {
    let user = user.ok_or(AppError::AuthMissing)?;
    let path = param(params, "*");
    if !state.evaluator.check(&user.name, path, AccessLevel::Delete).await? {
        return Err(AppError::Forbidden);
    }

    state.store.read_raw(private_path(params)).await.map_err(|_| AppError::NotFound("Not Found".into()))?;
    state.store.drop_document(private_path(params)).await?;
    Ok(ok_json(StatusCode::OK, json!({ "success": true })))
}
