use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_helpers::bearer_token;
use std::sync::Arc;

use crate::error::SessionError;
use crate::service::AuthService;

/// Raw access token of the current request, next to its [`Principal`](crate::Principal).
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

/// Rejects the request unless it carries a valid, unrevoked bearer token.
///
/// On success the [`Principal`](crate::Principal) and the raw [`AccessToken`]
/// are inserted as request extensions.
pub async fn require_principal(
    State(service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        tracing::debug!("No bearer token in Authorization header");
        return SessionError::InvalidToken("missing bearer token".to_string()).into_response();
    };

    match service.authenticate(&token).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            request.extensions_mut().insert(AccessToken(token));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
