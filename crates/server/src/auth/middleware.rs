//! # Authentication Middleware
//!
//! This module provides the JWT-based authentication for the `/api/v1` routes.
//! It defines an `AuthenticatedUser` extractor that handlers take to require a
//! valid bearer token and to learn the caller's user ID.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Represents the claims we expect to find in the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The subject of the token.
    pub sub: String,
    /// The expiration timestamp.
    pub exp: usize,
    /// An explicit user ID. When empty, the ID is derived from `sub`.
    #[serde(default)]
    pub user_id: String,
}

impl Claims {
    /// The user this token acts for.
    pub fn resolved_user_id(&self) -> String {
        if self.user_id.trim().is_empty() {
            user_id_for_subject(&self.sub)
        } else {
            self.user_id.clone()
        }
    }
}

/// The deterministic user ID of a token subject.
pub fn user_id_for_subject(sub: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, sub.as_bytes()).to_string()
}

/// An Axum extractor that provides the ID of the authenticated user.
///
/// Requests without a bearer token, or with one that is malformed, signed with
/// another secret or expired, are rejected with `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

/// A custom rejection type for authentication failures.
pub struct AuthError(StatusCode, String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(json!({ "error": self.1, "kind": "authentication_failed" })),
        )
            .into_response()
    }
}

fn unauthorized(message: &str) -> AuthError {
    AuthError(StatusCode::UNAUTHORIZED, message.to_string())
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    warn!("Rejected request without a usable bearer token: {}", e);
                    unauthorized("Missing or malformed bearer token.")
                })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let token_data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(state.jwt_secret().as_bytes()),
            &validation,
        )
        .map_err(|e| {
            warn!("JWT validation failed: {}", e);
            unauthorized("Invalid or expired token.")
        })?;

        let user_id = token_data.claims.resolved_user_id();
        debug!(%user_id, "Authenticated request");
        Ok(AuthenticatedUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_prefers_explicit_claim() {
        let claims = Claims {
            sub: "alice@example.com".to_string(),
            exp: 0,
            user_id: "user-1".to_string(),
        };
        assert_eq!(claims.resolved_user_id(), "user-1");
    }

    #[test]
    fn test_user_id_is_derived_from_subject() {
        let claims = Claims {
            sub: "alice@example.com".to_string(),
            exp: 0,
            user_id: String::new(),
        };
        let id = claims.resolved_user_id();
        assert_eq!(id, user_id_for_subject("alice@example.com"));
        assert_ne!(id, user_id_for_subject("bob@example.com"));
    }
}
