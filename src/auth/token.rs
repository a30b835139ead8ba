use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::{Principal, Privilege};
use crate::common::AppState;
use crate::error::{AppError, AppResult};

/// Claims carried by dashboard tokens. Tokens are issued by the external
/// account service with the shared HS256 secret; this side only verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub institute: String,
    pub privilege: i32,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
            institute: claims.institute,
            privilege: Privilege::from_level(claims.privilege),
        }
    }
}

/// Middleware guarding the node registry routes: validates the Bearer token
/// and injects the resolved [`Principal`] as a request extension.
pub async fn require_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = {
        let token = bearer_token(request.headers())?;
        decode_claims(token, &state.config.jwt_secret)?
    };
    request.extensions_mut().insert(Principal::from(claims));
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Authorization header must use the Bearer scheme".to_string())
    })?;

    if token.trim().is_empty() {
        return Err(AppError::Unauthorized("Empty bearer token".to_string()));
    }

    Ok(token)
}

fn decode_claims(token: &str, secret: &str) -> AppResult<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default())
        .map_err(|err| AppError::Unauthorized(format!("Invalid token: {err}")))?;
    Ok(data.claims)
}
