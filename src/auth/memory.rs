//! In-memory `UserStore` for tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::auth::{
    error::{StoreError, UniqueField},
    repo::UserStore,
    repo_types::{NewUser, User, UserStatus},
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    /// Existence checks always answer `false`, as if a concurrent insert had
    /// not landed yet.
    pub stale_exists: AtomicBool,
    pub fail_last_login: AtomicBool,
    pub fail_all: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, id: i64, status: UserStatus) {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == id) {
            u.status = status;
        }
    }

    pub fn snapshot(&self, id: i64) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn find<F: Fn(&User) -> bool>(&self, pred: F) -> Result<User, StoreError> {
        self.check_available()?;
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| pred(u))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn exists<F: Fn(&User) -> bool>(&self, pred: F) -> Result<bool, StoreError> {
        self.check_available()?;
        if self.stale_exists.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.users.lock().unwrap().iter().any(pred))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.check_available()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation(UniqueField::Username));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(UniqueField::Email));
        }
        let created = User {
            id: users.len() as i64 + 1,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            status: user.status,
            last_login_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.find(|u| u.username == username)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.find(|u| u.email == email)
    }

    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.find(|u| u.id == id)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        self.exists(|u| u.username == username)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.exists(|u| u.email == email)
    }

    async fn update_last_login(&self, id: i64) -> Result<(), StoreError> {
        self.check_available()?;
        if self.fail_last_login.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        user.last_login_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }
}
