//! JWT authentication middleware.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::api::AppState;
use crate::config::{AUTH_COOKIE_NAME, BEARER_TOKEN_PREFIX};
use crate::domain::{Actor, UserResponse, UserRole};
use crate::errors::{AppError, AppResult};
use crate::services::Claims;

/// Authenticated user, as stored when the request arrived
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// The caller as seen by the service layer
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.tenant_id, self.role)
    }
}

impl From<UserResponse> for CurrentUser {
    fn from(profile: UserResponse) -> Self {
        Self {
            id: profile.id,
            tenant_id: profile.tenant_id,
            role: UserRole::from(profile.role.as_str()),
            email: profile.email,
        }
    }
}

/// Pull the access token from the `Authorization` header, falling back to
/// the auth cookie. A malformed header does not fall through to the cookie.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        return value
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
            .map(str::to_string)
            .ok_or(AppError::Unauthorized);
    }

    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// JWT authentication middleware.
///
/// Validates the bearer token or auth cookie, then injects the
/// `CurrentUser` into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())?;
    let claims = state.services.auth().verify_token(&token)?;
    let current_user = resolve_current_user(&state, claims).await?;

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Role and liveness come from the stored account rather than the token,
/// so demotions and deletions apply on the next request. Profile updates
/// and deletions invalidate the cached copy.
async fn resolve_current_user(state: &AppState, claims: Claims) -> AppResult<CurrentUser> {
    match state.cache.get_user(&claims.sub).await {
        Ok(Some(profile)) if profile.tenant_id == claims.tenant_id => {
            return Ok(CurrentUser::from(profile));
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(user_id = %claims.sub, error = %e, "Profile cache unavailable"),
    }

    let user = state.services.auth().session_user(&claims).await?;
    let profile = UserResponse::from(user);
    if let Err(e) = state.cache.set_user(&profile).await {
        tracing::warn!(user_id = %profile.id, error = %e, "Failed to cache profile");
    }
    Ok(CurrentUser::from(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    #[test]
    fn test_bearer_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert(COOKIE, HeaderValue::from_static("access_token=cookie-token"));
        assert_eq!(extract_token(&headers).unwrap(), "header-token");
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; access_token=abc"));
        assert_eq!(extract_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn test_malformed_header_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        headers.insert(COOKIE, HeaderValue::from_static("access_token=abc"));
        assert!(matches!(extract_token(&headers), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_missing_token() {
        assert!(extract_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_stored_role_wins_over_token() {
        let profile = UserResponse {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "demoted@example.com".to_string(),
            name: "Demoted".to_string(),
            role: "user".to_string(),
            created_at: chrono::Utc::now(),
        };
        let user = CurrentUser::from(profile);
        assert_eq!(user.role, UserRole::User);
        assert!(!user.actor().is_admin());
    }
}
