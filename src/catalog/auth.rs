//! Bearer-JWT authentication.
//!
//! Tokens carry `{sub, role, exp}` and are signed HS256. Admin-only routes
//! additionally require `role == "admin"`, mirroring the original
//! `protect` / `adminOnly` middleware pair.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::error::ApiError;
use super::models::{Role, User};
use super::state::AppState;

/// Token lifetime: 30 days.
const TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub exp: u64,
}

pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::Internal(e.into()))?
            .as_secs();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            exp: now + TOKEN_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(e.into()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::InvalidToken)
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| ApiError::Internal(e.into()))
}

pub fn verify_password(password: &str, digest: &str) -> bool {
    bcrypt::verify(password, digest).unwrap_or(false)
}

/// The authenticated user, inserted into request extensions by
/// [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Validates the bearer token and loads the user. The token alone is not
/// enough; the account must still exist.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(ApiError::MissingToken)?;
    let claims = state.keys.verify(token)?;

    let user = state
        .store
        .user_by_id(&claims.sub)
        .await?
        .ok_or(ApiError::UserGone)?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

fn is_admin(current: Option<&CurrentUser>) -> bool {
    current
        .map(|current| current.0.role == Role::Admin)
        .unwrap_or(false)
}

/// Runs inside `require_user`; rejects non-admin accounts.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    if !is_admin(req.extensions().get::<CurrentUser>()) {
        return Err(ApiError::AdminOnly);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(role: Role) -> User {
        User {
            id: "42".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_digest: String::new(),
            role,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let keys = AuthKeys::new(b"test-secret");
        let token = keys.issue(&test_user(Role::Admin)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_token_expiry_in_future() {
        let keys = AuthKeys::new(b"test-secret");
        let token = keys.issue(&test_user(Role::User)).unwrap();
        let claims = keys.verify(&token).unwrap();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(claims.exp > now + TOKEN_TTL_SECS - 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = AuthKeys::new(b"test-secret");
        let token = keys.issue(&test_user(Role::User)).unwrap();

        let other = AuthKeys::new(b"other-secret");
        assert!(matches!(
            other.verify(&token),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let keys = AuthKeys::new(b"test-secret");
        assert!(keys.verify("not.a.token").is_err());
    }

    #[test]
    fn test_admin_gate() {
        assert!(is_admin(Some(&CurrentUser(test_user(Role::Admin)))));
        assert!(!is_admin(Some(&CurrentUser(test_user(Role::User)))));
        assert!(!is_admin(None));
    }

    #[test]
    fn test_password_roundtrip() {
        let digest = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &digest));
        assert!(!verify_password("hunter3", &digest));
    }

    #[test]
    fn test_verify_password_with_bad_digest() {
        assert!(!verify_password("hunter2", "not-a-bcrypt-digest"));
    }
}
