//! Session verification
//!
//! Sessions are issued by the external identity provider; this module only
//! validates the bearer token and exposes the authenticated user to
//! handlers. The login/registration flow itself lives with the provider.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Claims carried by identity-provider tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Organization (clinic) the session is scoped to
    pub org_id: Uuid,
    /// User role within the organization
    pub role: String,
    /// Expiration
    pub exp: i64,
}

/// Authenticated user attached to requests as an extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role: String,
}

/// Validate the bearer token and attach `AuthUser` to the request
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = verify_token(token, &state.config.jwt_secret)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        org_id: claims.org_id,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| {
        tracing::debug!("Token verification failed: {}", err);
        ApiError::InvalidToken
    })
}
