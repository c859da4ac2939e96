use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::models::{Role, User, UserSummary};
use crate::shared::state::AppState;
use crate::shared::validators::{is_valid_email, is_valid_password};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Verified caller identity, extracted from the bearer token. The rest of
/// the server trusts this as already authenticated.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|auth| {
            if auth.to_lowercase().starts_with("bearer ") {
                Some(auth[7..].to_string())
            } else {
                None
            }
        })
}

pub fn generate_token(user: &User, secret: &str, ttl_days: i64) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + chrono::Duration::days(ttl_days)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Token generation failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Token verification failed: {}", e);
            None
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
        let claims = verify_token(&token, &state.config.auth.jwt_secret)
            .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))?;
        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    if !is_valid_email(&req.email) {
        return Err(ApiError::Validation("Valid email is required".to_string()));
    }
    if !is_valid_password(&req.password) {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let email = req.email.to_lowercase();
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Validation("Email already registered".to_string()));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email,
        password_hash: hash_password(&req.password)?,
        // Self-registration always produces a client; agents are provisioned
        // out of band.
        role: Role::Client,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_user(user.clone()).await.map_err(|e| {
        error!("Failed to create user: {}", e);
        ApiError::Internal("Failed to create user".to_string())
    })?;

    let token = generate_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !is_valid_email(&req.email) || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = generate_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )?;
    Ok(Json(AuthResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_util;

    #[test]
    fn password_round_trip() {
        test_util::setup();
        let hash = hash_password("hunter42").unwrap();
        assert_ne!(hash, "hunter42");
        assert!(verify_password("hunter42", &hash));
        assert!(!verify_password("hunter43", &hash));
    }

    #[test]
    fn token_round_trip_carries_identity() {
        test_util::setup();
        let user = test_util::make_user(Role::Agent, "agent@example.com");
        let token = generate_token(&user, "secret", 7).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "agent@example.com");
        assert_eq!(claims.role, Role::Agent);
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        test_util::setup();
        let user = test_util::make_user(Role::Client, "c@example.com");
        let token = generate_token(&user, "secret", 7).unwrap();
        assert!(verify_token(&token, "other-secret").is_none());
    }
}
