use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{Extensions, HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::Actor;
use crate::models::user::User;
use crate::services::AuthError;
use crate::services::audit::{self, ClientMeta};

pub const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub must_change_password: bool,
}

#[derive(Serialize)]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: User,
    pub full_name: String,
    pub is_admin: bool,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::Inactive => Self::Forbidden(err.to_string()),
            AuthError::Unauthorized => Self::Unauthorized("Authentication required".to_string()),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// The signed-in user, placed in request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.0.actor()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

fn client_meta(headers: &HeaderMap, extensions: &Extensions) -> ClientMeta {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    ClientMeta::new(header("x-forwarded-for"), peer, header("user-agent"))
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(client_meta(&parts.headers, &parts.extensions))
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Routes a user flagged with `must_change_password` may still reach.
fn is_password_change_exempt(path: &str) -> bool {
    let path = path.strip_prefix("/api").unwrap_or(path);
    matches!(path, "/auth/me" | "/auth/password" | "/auth/logout")
}

/// Resolves the session user and enforces the forced password change.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = session
        .get::<i32>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let user = match state.auth_service().session_user(user_id).await {
        Ok(user) => user,
        Err(AuthError::Unauthorized) => {
            let _ = session.flush().await;
            return Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::Span::current().record("user_id", user.id);

    if user.must_change_password && !is_password_change_exempt(request.uri().path()) {
        return Err(ApiError::forbidden("Password change required"));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Must run inside [`auth_middleware`].
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>() else {
        return Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        ));
    };

    if !user.is_admin() {
        let client = client_meta(request.headers(), request.extensions());
        audit::permission_denied(user.id, request.uri().path(), &client);
        return Err(ApiError::forbidden("Admin privileges are required."));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientMeta,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = match state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            let reason = match e {
                AuthError::InvalidCredentials => "invalid_credentials",
                AuthError::Inactive => "inactive",
                _ => "error",
            };
            audit::login_failed(payload.email.trim(), reason, &client);
            return Err(e.into());
        }
    };

    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    audit::login_succeeded(user.id, &user.email, &client);

    Ok(Json(ApiResponse::success(LoginResponse {
        must_change_password: user.must_change_password,
        user,
    })))
}

/// POST /auth/logout
pub async fn logout(
    client: ClientMeta,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = session.get::<i32>(SESSION_USER_KEY).await.ok().flatten();

    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to end session: {e}")))?;

    audit::logged_out(user_id, &client);

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "You have been logged out.",
    ))))
}

/// GET /auth/me
pub async fn get_current_user(
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<CurrentUserResponse>> {
    Json(ApiResponse::success(CurrentUserResponse {
        full_name: user.full_name(),
        is_admin: user.is_admin(),
        user,
    }))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    client: ClientMeta,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;

    audit::password_changed(user.id, &client);

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Your password was successfully updated.",
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_change_exemptions() {
        assert!(is_password_change_exempt("/auth/me"));
        assert!(is_password_change_exempt("/api/auth/password"));
        assert!(is_password_change_exempt("/api/auth/logout"));
        assert!(!is_password_change_exempt("/api/dashboard"));
        assert!(!is_password_change_exempt("/auth/login"));
    }

    #[test]
    fn test_client_meta_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("user-agent", "curl/8.0".parse().unwrap());

        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let meta = client_meta(&headers, &extensions);
        assert_eq!(meta.ip, "203.0.113.7");
        assert_eq!(meta.user_agent, "curl/8.0");
    }

    #[test]
    fn test_client_meta_falls_back_to_peer() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 4000))));

        let meta = client_meta(&HeaderMap::new(), &extensions);
        assert_eq!(meta.ip, "192.168.1.5");
    }
}
