//! API-level tests.
//!
//! Run without a database or Redis: stateless routes are driven through
//! `tower::ServiceExt::oneshot`, and the service container is exercised
//! with hand-written mock services.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use tower::ServiceExt;
use uuid::Uuid;

use officehub::api::handlers::{code_handler, unit_handler};
use officehub::api::middleware::{extract_token, CurrentUser};
use officehub::domain::{Language, Permission, User, UserResponse, UserRole};
use officehub::errors::{AppError, AppResult};
use officehub::services::{
    AuthService, Claims, MockServiceContainer, Registration, ServiceContainer, TokenResponse,
};

// =============================================================================
// Mock Services for Testing
// =============================================================================

/// Accepts a single fixed token whose admin claim the store has revoked
struct StaticAuthService {
    tenant_id: Uuid,
    user_id: Uuid,
}

#[async_trait]
impl AuthService for StaticAuthService {
    async fn register(&self, registration: Registration) -> AppResult<User> {
        Ok(User::new(
            Uuid::new_v4(),
            self.tenant_id,
            registration.email,
            "hashed".to_string(),
            registration.name,
        ))
    }

    async fn login(&self, _email: String, _password: String) -> AppResult<TokenResponse> {
        Ok(TokenResponse {
            access_token: "valid-test-token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 86400,
        })
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        if token == "valid-test-token" {
            Ok(Claims {
                sub: self.user_id,
                tenant_id: self.tenant_id,
                email: "test@example.com".to_string(),
                role: "admin".to_string(),
                exp: Utc::now().timestamp() + 3600,
                iat: Utc::now().timestamp(),
            })
        } else {
            Err(AppError::Unauthorized)
        }
    }

    async fn session_user(&self, claims: &Claims) -> AppResult<User> {
        if claims.sub != self.user_id {
            return Err(AppError::Unauthorized);
        }
        Ok(User::new(
            claims.sub,
            claims.tenant_id,
            claims.email.clone(),
            "hashed".to_string(),
            "Demoted Admin".to_string(),
        ))
    }
}

fn container(tenant_id: Uuid) -> Arc<dyn ServiceContainer> {
    let auth: Arc<dyn AuthService> = Arc::new(StaticAuthService {
        tenant_id,
        user_id: Uuid::new_v4(),
    });
    let mut services = MockServiceContainer::new();
    services.expect_auth().returning(move || auth.clone());
    Arc::new(services)
}

// =============================================================================
// Authentication plumbing
// =============================================================================

#[tokio::test]
async fn test_cookie_token_resolves_to_current_user() {
    let tenant_id = Uuid::new_v4();
    let services = container(tenant_id);

    let request = Request::builder()
        .header("Cookie", "theme=dark; access_token=valid-test-token")
        .body(Body::empty())
        .unwrap();
    let token = extract_token(request.headers()).unwrap();

    let claims = services.auth().verify_token(&token).unwrap();
    assert_eq!(claims.role, "admin");

    let stored = services.auth().session_user(&claims).await.unwrap();
    let user = CurrentUser::from(UserResponse::from(stored));

    assert_eq!(user.tenant_id, tenant_id);
    assert_eq!(user.role, UserRole::User);
    assert!(!user.actor().is_admin());
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let services = container(Uuid::new_v4());

    let request = Request::builder()
        .header("Authorization", "Bearer forged")
        .body(Body::empty())
        .unwrap();
    let token = extract_token(request.headers()).unwrap();

    let error = services.auth().verify_token(&token).unwrap_err();
    assert_eq!(error.into_response().status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Stateless routes
// =============================================================================

async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_language_catalogue() {
    let router = Router::new().route("/languages", get(code_handler::languages));
    let (status, body) = get_json(router, "/languages").await;

    assert_eq!(status, StatusCode::OK);
    let languages = body.as_array().unwrap();
    assert_eq!(languages.len(), Language::ALL.len());
    assert!(languages.contains(&serde_json::json!("rust")));
}

#[tokio::test]
async fn test_permission_catalogue() {
    let router = Router::new().route("/permissions", get(unit_handler::permission_catalogue));
    let (status, body) = get_json(router, "/permissions").await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(names.len(), Permission::ALL.len());
    assert!(names.contains(&"units.manage"));
    assert!(names.contains(&"remote.control"));
}

// =============================================================================
// Error Type Tests
// =============================================================================

async fn error_body(error: AppError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_app_error_status_codes() {
    let cases = [
        (AppError::NotFound, StatusCode::NOT_FOUND),
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
        (AppError::Forbidden, StatusCode::FORBIDDEN),
        (AppError::validation("bad"), StatusCode::BAD_REQUEST),
        (AppError::conflict("Link"), StatusCode::CONFLICT),
        (AppError::state_conflict("busy"), StatusCode::CONFLICT),
        (AppError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        assert_eq!(error.into_response().status(), expected);
    }
}

#[tokio::test]
async fn test_error_body_shape() {
    let (status, body) = error_body(AppError::state_conflict("The callee is already on a call")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "STATE_CONFLICT");
    assert_eq!(body["error"]["message"], "The callee is already on a call");

    // internal details never reach the client
    let (_, body) = error_body(AppError::internal("redis pool exhausted")).await;
    assert_eq!(body["error"]["message"], "An internal error occurred");
}

// =============================================================================
// Password Hashing Tests
// =============================================================================

#[tokio::test]
async fn test_password_hashing() {
    use officehub::domain::Password;

    let plain_password = "secure_password_123";
    let password = Password::new(plain_password).expect("Hashing should succeed");
    let hash = password.into_string();

    assert_ne!(hash.as_str(), plain_password);

    let stored = Password::from_hash(hash);
    assert!(stored.verify(plain_password));
    assert!(!stored.verify("wrong_password"));
}

#[tokio::test]
async fn test_short_password_rejected() {
    use officehub::domain::Password;

    assert!(matches!(
        Password::new("short"),
        Err(AppError::Validation(_))
    ));
}
