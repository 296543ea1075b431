//! Authentication service - registration, login and token verification.
//!
//! Registration creates the tenant on first use of a slug and makes that
//! first user its admin. Password handling lives in `domain::Password`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{tenant::normalize_slug, NewUser, Password, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::with_transaction;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token expiration time in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// Registration input after request validation
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub tenant_slug: String,
    /// Display name for a new tenant; defaults to the slug
    pub tenant_name: Option<String>,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a user, creating the tenant when the slug is new
    async fn register(&self, registration: Registration) -> AppResult<User>;

    /// Login and return JWT token
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// The live account behind verified claims. Deleted accounts are
    /// unauthorized even while their token is still valid.
    async fn session_user(&self, claims: &Claims) -> AppResult<User>;
}

fn generate_token(user: &User, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        tenant_id: user.tenant_id,
        email: user.email.clone(),
        role: user.role.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

fn decode_token(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register(&self, registration: Registration) -> AppResult<User> {
        let Registration {
            email,
            password,
            name,
            tenant_slug,
            tenant_name,
        } = registration;

        let slug = normalize_slug(&tenant_slug)?;
        let email = email.trim().to_lowercase();
        let tenant_name = tenant_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| slug.clone());
        let password_hash = Password::new(&password)?.into_string();

        let user = with_transaction!(self.uow, |ctx| {
            // soft-deleted accounts keep their email reserved
            if ctx.users().find_by_email_with_deleted(&email).await?.is_some() {
                return Err(AppError::conflict("User"));
            }

            let (tenant, role) = match ctx.tenants().find_by_slug(&slug).await? {
                Some(tenant) => (tenant, UserRole::User),
                None => (ctx.tenants().create(tenant_name, slug).await?, UserRole::Admin),
            };

            ctx.users()
                .create(NewUser {
                    tenant_id: tenant.id,
                    email,
                    password_hash,
                    name,
                    role,
                })
                .await
        })?;

        tracing::info!(
            user_id = %user.id,
            tenant_id = %user.tenant_id,
            role = %user.role,
            "User registered"
        );
        Ok(user)
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let email = email.trim().to_lowercase();
        let user = self.uow.users().find_by_email(&email).await?;

        // Verify against a dummy hash for unknown accounts so response
        // timing does not reveal which emails exist.
        let stored = match &user {
            Some(user) => Password::from_hash(user.password_hash.clone()),
            None => Password::dummy(),
        };
        let password_valid = stored.verify(&password);

        match user {
            Some(user) if password_valid && user.is_active() => generate_token(&user, &self.config),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode_token(token, &self.config)
    }

    async fn session_user(&self, claims: &Claims) -> AppResult<User> {
        match self.uow.users().find_by_id(claims.tenant_id, claims.sub).await? {
            Some(user) if user.is_active() => Ok(user),
            _ => {
                tracing::debug!(user_id = %claims.sub, "Token for a removed account");
                Err(AppError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "jane@example.com".into(),
            "hash".into(),
            "Jane".into(),
        )
    }

    #[test]
    fn test_token_round_trip_carries_tenant() {
        let config = Config::for_tests("a-test-secret-that-is-at-least-32-chars");
        let user = user();
        let token = generate_token(&user, &config).unwrap();

        let claims = decode_token(&token.access_token, &config).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.tenant_id, user.tenant_id);
        assert_eq!(claims.role, "user");
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let config = Config::for_tests("a-test-secret-that-is-at-least-32-chars");
        let other = Config::for_tests("another-secret-that-is-at-least-32-chars");
        let token = generate_token(&user(), &config).unwrap();

        assert!(matches!(
            decode_token(&token.access_token, &other),
            Err(AppError::Jwt(_))
        ));
    }
}
