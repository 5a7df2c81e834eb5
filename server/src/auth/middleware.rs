//! Authentication middleware.
//!
//! Every document lives under `users/{userId}`, so authentication reduces to
//! learning which user is calling. The bearer token is the user id, followed
//! by `.` and the shared secret when `AUTH_SECRET` is configured. Requests
//! without a token are refused unless anonymous access was switched on and
//! no secret is set.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Authenticated caller extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The calling user, or `None` for anonymous access in development mode
    pub user_id: Option<String>,
}

impl AuthUser {
    /// Check that the caller may touch documents of `user_id`.
    pub fn authorize(&self, user_id: &str) -> Result<(), AppError> {
        match &self.user_id {
            Some(caller) if caller != user_id => Err(AppError::Forbidden(format!(
                "user '{}' may not access documents of '{}'",
                caller, user_id
            ))),
            _ => Ok(()),
        }
    }
}

/// Parse a bearer token into the user id it names.
pub fn verify_token(token: &str, secret: Option<&str>) -> Option<String> {
    let user_id = match secret {
        Some(secret) => {
            let (user_id, given) = token.rsplit_once('.')?;
            if !constant_time_eq(given.as_bytes(), secret.as_bytes()) {
                return None;
            }
            user_id
        }
        None => token,
    };

    if user_id.is_empty() || user_id.contains('/') {
        return None;
    }
    Some(user_id.to_string())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let secret = state.config.auth_secret.as_deref();

        match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ");
                match verify_token(token, secret) {
                    Some(user_id) => Ok(AuthUser {
                        user_id: Some(user_id),
                    }),
                    None => {
                        tracing::debug!("Rejected bearer token");
                        Err(AppError::Unauthorized)
                    }
                }
            }
            Some(_) => Err(AppError::Unauthorized),
            None if secret.is_none() && state.config.allow_anonymous => {
                Ok(AuthUser { user_id: None })
            }
            None => Err(AppError::Unauthorized),
        }
    }
}
