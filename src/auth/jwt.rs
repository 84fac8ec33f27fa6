use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::{
    claims::{Claims, TokenKind},
    error::TokenError,
};
use crate::config::JwtConfig;

/// Upper bound for either token lifetime (ten years).
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

/// Access and refresh token minted together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64, // access token lifetime in seconds
}

/// Signs and verifies token pairs. Built once at startup and shared read-only.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry_check: Validation,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        if cfg.secret.is_empty() {
            anyhow::bail!("jwt secret must not be empty");
        }
        let access_ttl = ttl_from_minutes(cfg.ttl_minutes)?;
        let refresh_ttl = ttl_from_minutes(cfg.refresh_ttl_minutes)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = 0;

        // Expiry is judged before the signature, so a stale token reports
        // `Expired` whoever signed it.
        let mut expiry_check = Validation::new(Algorithm::HS256);
        expiry_check.insecure_disable_signature_validation();
        expiry_check.validate_aud = false;
        expiry_check.set_required_spec_claims(&["exp"]);
        expiry_check.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            expiry_check,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl,
            refresh_ttl,
        })
    }

    fn sign_with_kind(
        &self,
        user_id: i64,
        username: &str,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now
            .checked_add(TimeDuration::seconds(ttl.as_secs() as i64))
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            user_id,
            username: username.to_owned(),
            token_type: kind,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id, kind = %kind, "jwt signed");
        Ok(token)
    }

    pub fn generate_token_pair(&self, user_id: i64, username: &str) -> Result<TokenPair, TokenError> {
        let now = OffsetDateTime::now_utc();
        Ok(TokenPair {
            access_token: self.sign_with_kind(user_id, username, TokenKind::Access, now)?,
            refresh_token: self.sign_with_kind(user_id, username, TokenKind::Refresh, now)?,
            token_type: "Bearer".into(),
            expires_in: self.access_ttl.as_secs(),
        })
    }

    pub fn validate_and_decode(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        if let Err(e) = decode::<serde::de::IgnoredAny>(token, &self.decoding, &self.expiry_check) {
            if let TokenError::Expired = TokenError::from(e) {
                return Err(TokenError::Expired);
            }
        }
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        let claims = data.claims;
        if claims.token_type != expected {
            return Err(TokenError::WrongTokenType {
                expected,
                found: claims.token_type,
            });
        }
        debug!(user_id = claims.user_id, kind = %claims.token_type, "jwt verified");
        Ok(claims)
    }

    /// Mints a fresh pair from a valid refresh token.
    ///
    /// The presented refresh token stays valid until its own expiry; nothing
    /// here records that it has been used.
    pub fn refresh_token_pair(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims = self.validate_and_decode(refresh_token, TokenKind::Refresh)?;
        self.generate_token_pair(claims.user_id, &claims.username)
    }
}

fn ttl_from_minutes(minutes: i64) -> anyhow::Result<Duration> {
    if minutes <= 0 || minutes > MAX_TTL_MINUTES {
        anyhow::bail!("jwt ttl must be between 1 and {MAX_TTL_MINUTES} minutes, got {minutes}");
    }
    let secs = (minutes as u64)
        .checked_mul(60)
        .ok_or_else(|| anyhow::anyhow!("jwt ttl overflows: {minutes} minutes"))?;
    Ok(Duration::from_secs(secs))
}
