use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::{
    error::{StoreError, UniqueField},
    repo_types::{NewUser, User},
};

/// Persistence capability the auth service depends on.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn get_by_username(&self, username: &str) -> Result<User, StoreError>;
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;
    async fn get_by_id(&self, id: i64) -> Result<User, StoreError>;
    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;
    async fn update_last_login(&self, id: i64) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, status, last_login_at, created_at";

/// `UserStore` on PostgreSQL. Uniqueness is enforced by the
/// `users_username_key` and `users_email_key` constraints.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn exists_by(&self, column: &str, value: &str) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {column} = $1)");
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("email") => UniqueField::Email,
                _ => UniqueField::Username,
            };
            return StoreError::UniqueViolation(field);
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.status)
            .fetch_one(&self.db)
            .await
            .map_err(map_insert_error)
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.fetch_one_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.fetch_one_by("email", email).await
    }

    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        self.exists_by("username", username).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.exists_by("email", email).await
    }

    async fn update_last_login(&self, id: i64) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
