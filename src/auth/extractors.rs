use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{
    claims::{Claims, TokenKind},
    error::{AuthError, TokenError},
    jwt::TokenIssuer,
};

/// Extracts and validates a bearer access token, returning its claims.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenIssuer>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let issuer = Arc::<TokenIssuer>::from_ref(state);

        // Expect "Bearer <token>"
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .ok_or(AuthError::Token(TokenError::Malformed))?;

        let claims = issuer
            .validate_and_decode(token.trim(), TokenKind::Access)
            .map_err(|e| {
                warn!(error = %e, "bearer token rejected");
                AuthError::Token(e)
            })?;

        Ok(AuthUser(claims))
    }
}
