//! Account registration, login and token refresh on top of a `UserStore`.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::auth::{
    dto::RegisterRequest,
    error::{AuthError, StoreError, UniqueField},
    jwt::{TokenIssuer, TokenPair},
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::{NewUser, PublicUser, UserStatus},
};

const USERNAME_LEN: (usize, usize) = (3, 50);
const PASSWORD_LEN: (usize, usize) = (6, 32);

lazy_static! {
    /// Stand-in hash checked when the username is unknown, so that path costs
    /// the same Argon2 work as a wrong password.
    static ref DUMMY_HASH: String = hash_password("autoauth-unknown-user").unwrap_or_default();
}

async fn verify_blocking(plain: &str, hash: String) -> Result<bool, AuthError> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.into()))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), AuthError> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(AuthError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

/// Trims and lowercases where appropriate, then checks shape.
pub(crate) fn normalize_registration(mut req: RegisterRequest) -> Result<RegisterRequest, AuthError> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();

    check_len("username", &req.username, USERNAME_LEN)?;
    check_len("password", &req.password, PASSWORD_LEN)?;
    if !is_valid_email(&req.email) {
        return Err(AuthError::Validation("invalid email".into()));
    }
    Ok(req)
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    async fn ensure_available(&self, username: &str, email: &str) -> Result<(), AuthError> {
        if self.store.exists_by_username(username).await? {
            return Err(AuthError::Conflict(UniqueField::Username));
        }
        if self.store.exists_by_email(email).await? {
            return Err(AuthError::Conflict(UniqueField::Email));
        }
        Ok(())
    }

    /// Creates an active account. The uniqueness pre-check only gives an early
    /// answer; a constraint violation from the insert is reported the same way.
    pub async fn register(&self, req: RegisterRequest) -> Result<PublicUser, AuthError> {
        let req = normalize_registration(req)?;
        self.ensure_available(&req.username, &req.email).await?;

        let RegisterRequest {
            username,
            password,
            email,
        } = req;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.into()))?
            .map_err(AuthError::Hashing)?;

        let user = self
            .store
            .create(NewUser {
                username,
                email,
                password_hash,
                status: UserStatus::Active,
            })
            .await
            .map_err(|e| {
                if let StoreError::UniqueViolation(field) = &e {
                    warn!(%field, "unique constraint hit after pre-check");
                }
                AuthError::from(e)
            })?;

        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user.into())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(TokenPair, PublicUser), AuthError> {
        let username = username.trim();
        let user = match self.store.get_by_username(username).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                verify_blocking(password, DUMMY_HASH.clone()).await?;
                warn!(%username, "login unknown username");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::Storage(e)),
        };

        if user.status != UserStatus::Active {
            warn!(user_id = user.id, "login on disabled account");
            return Err(AuthError::AccountDisabled);
        }

        if !verify_blocking(password, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.generate_token_pair(user.id, &user.username)?;

        if let Err(e) = self.store.update_last_login(user.id).await {
            warn!(error = %e, user_id = user.id, "update last_login_at failed");
        }

        info!(user_id = user.id, username = %user.username, "user logged in");
        Ok((tokens, user.into()))
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let pair = self.tokens.refresh_token_pair(refresh_token)?;
        debug!("token pair refreshed");
        Ok(pair)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<PublicUser, AuthError> {
        let user = self.store.get_by_id(id).await?;
        Ok(user.into())
    }
}
