use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::ValidatedJson;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{SessionError, SessionResult};
use crate::middleware::{AccessToken, require_principal};
use crate::models::{
    LoginRequest, LogoutRequest, OtpSendRequest, OtpStatusQuery, OtpVerifyRequest,
    RefreshRequest, RegisterRequest, TokenPair,
};
use crate::otp::OtpStatus;
use crate::principal::Principal;
use crate::service::AuthService;
use crate::sessions::SessionInfo;

/// Create the auth router with all HTTP endpoints
pub fn router(service: AuthService) -> Router {
    let shared_service = Arc::new(service);

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/me", get(me))
        .route("/sessions", get(list_sessions))
        .route_layer(middleware::from_fn_with_state(
            shared_service.clone(),
            require_principal,
        ));

    let auth = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/otp/send", post(send_otp))
        .route("/otp/verify", post(verify_otp))
        .route("/otp/status", get(otp_status))
        .merge(protected)
        .with_state(shared_service);

    Router::new().nest("/auth", auth)
}

/// Create a pending account and send its first code
///
/// POST /auth/register
async fn register(
    State(service): State<Arc<AuthService>>,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> SessionResult<impl IntoResponse> {
    let registration = service.register(&input.email, &input.password).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, "/auth/otp/verify")],
        Json(registration),
    ))
}

/// Password login
///
/// POST /auth/login
async fn login(
    State(service): State<Arc<AuthService>>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> SessionResult<Json<TokenPair>> {
    let pair = service
        .login(&input.email, &input.password, input.session_id.as_deref())
        .await?;
    Ok(Json(pair))
}

/// Rotate a refresh token
///
/// POST /auth/refresh
async fn refresh(
    State(service): State<Arc<AuthService>>,
    ValidatedJson(input): ValidatedJson<RefreshRequest>,
) -> SessionResult<Json<TokenPair>> {
    let pair = service
        .refresh(&input.refresh_token, input.session_id.as_deref())
        .await?;
    Ok(Json(pair))
}

/// POST /auth/logout
async fn logout(
    State(service): State<Arc<AuthService>>,
    Extension(principal): Extension<Principal>,
    Extension(AccessToken(access_token)): Extension<AccessToken>,
    body: Option<Json<LogoutRequest>>,
) -> SessionResult<StatusCode> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    input
        .validate()
        .map_err(|e| SessionError::Validation(e.to_string()))?;

    service
        .logout(&principal, &access_token, input.refresh_token.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct LogoutAllResponse {
    revoked_sessions: u64,
}

/// POST /auth/logout-all
async fn logout_all(
    State(service): State<Arc<AuthService>>,
    Extension(principal): Extension<Principal>,
) -> SessionResult<Json<LogoutAllResponse>> {
    let revoked_sessions = service.logout_all(&principal).await?;
    Ok(Json(LogoutAllResponse { revoked_sessions }))
}

/// GET /auth/me
async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

/// GET /auth/sessions
async fn list_sessions(
    State(service): State<Arc<AuthService>>,
    Extension(principal): Extension<Principal>,
) -> SessionResult<Json<Vec<SessionInfo>>> {
    Ok(Json(service.active_sessions(&principal).await?))
}

/// Send a one-time code
///
/// POST /auth/otp/send
async fn send_otp(
    State(service): State<Arc<AuthService>>,
    ValidatedJson(input): ValidatedJson<OtpSendRequest>,
) -> SessionResult<impl IntoResponse> {
    let status = service.send_otp(&input.email).await?;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// Verify a one-time code and log in
///
/// POST /auth/otp/verify
async fn verify_otp(
    State(service): State<Arc<AuthService>>,
    ValidatedJson(input): ValidatedJson<OtpVerifyRequest>,
) -> SessionResult<Json<TokenPair>> {
    let pair = service
        .verify_otp(&input.email, &input.code, input.session_id.as_deref())
        .await?;
    Ok(Json(pair))
}

/// GET /auth/otp/status?email=
async fn otp_status(
    State(service): State<Arc<AuthService>>,
    Query(query): Query<OtpStatusQuery>,
) -> SessionResult<Json<OtpStatus>> {
    query
        .validate()
        .map_err(|e| SessionError::Validation(e.to_string()))?;
    Ok(Json(service.otp_status(&query.email).await?))
}
