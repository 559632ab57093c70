//! User accounts and credential checks.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::Utc;
use rand_core::OsRng;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::domain::entities::{NewUser, User, UserInfo};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

/// Service for logging users in and managing accounts.
pub struct UserService<R: UserRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: UserRepository + ?Sized> UserService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Checks a username/password pair.
    ///
    /// Returns `None` for unknown users, locked accounts and wrong passwords.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<UserInfo>, AppError> {
        let Some(user) = self.repository.find_by_username(username.trim()).await? else {
            debug!(username, "Login for unknown user");
            return Ok(None);
        };

        if user.locked {
            debug!(username, "Login for locked user");
            return Ok(None);
        }

        if !verify_password_blocking(password, &user.password_hash).await? {
            return Ok(None);
        }

        Ok(Some(user.to_info()))
    }

    /// Creates a user with an Argon2id password hash.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for empty usernames or short passwords,
    /// [`AppError::Conflict`] if the username is taken.
    pub async fn create_user(
        &self,
        username: &str,
        nick_name: &str,
        email: Option<String>,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AppError> {
        let username = username.trim();
        if username.is_empty() || username.len() > 64 {
            return Err(AppError::bad_request(
                "Invalid username",
                json!({"reason": "Username must be 1 to 64 characters"}),
            ));
        }
        if password.chars().count() < 8 {
            return Err(AppError::bad_request(
                "Password too short",
                json!({"reason": "Password must be at least 8 characters"}),
            ));
        }

        let nick_name = match nick_name.trim() {
            "" => username.to_string(),
            nick => nick.to_string(),
        };

        self.repository
            .create(NewUser {
                username: username.to_string(),
                nick_name,
                email,
                password_hash: hash_password_blocking(password).await?,
                is_admin,
            })
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.repository.list().await
    }

    /// Stores the login time on the user row.
    pub async fn touch_last_login(&self, user_id: i64) -> Result<(), AppError> {
        self.repository.update_last_login(user_id, Utc::now()).await
    }

    /// Whether the user table is reachable.
    pub async fn health_check(&self) -> bool {
        self.repository.count().await.is_ok()
    }
}

/// Hashes a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal("Password hashing failed", json!({"reason": e.to_string()})))
}

/// Verifies a password against a stored PHC hash string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Runs [`verify_password`] on the blocking pool; Argon2 takes tens of
/// milliseconds per call.
pub async fn verify_password_blocking(password: &str, hash: &str) -> Result<bool, AppError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::internal("Password check failed", json!({"reason": e.to_string()})))
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::internal("Password hashing failed", json!({"reason": e.to_string()})))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUserRepository;

    fn user(password: &str, locked: bool) -> User {
        User {
            id: 1,
            username: "masuit".to_string(),
            nick_name: "Masuit".to_string(),
            email: None,
            password_hash: hash_password(password).unwrap(),
            is_admin: true,
            avatar: None,
            locked,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("x", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut repo = MockUserRepository::new();
        let stored = user("hunter22", false);
        repo.expect_find_by_username()
            .withf(|name| name == "masuit")
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));

        let service = UserService::new(Arc::new(repo));
        let info = service.login(" masuit ", "hunter22").await.unwrap().unwrap();

        assert_eq!(info.username, "masuit");
        assert!(info.is_admin);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_login_yields_while_hashing() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let mut repo = MockUserRepository::new();
        let stored = user("hunter22", false);
        repo.expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));
        let service = UserService::new(Arc::new(repo));

        let other_ran = Arc::new(AtomicBool::new(false));
        let flag = other_ran.clone();
        tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

        // the single runtime thread is free to run other tasks during the check
        assert!(service.login("masuit", "hunter22").await.unwrap().is_some());
        assert!(other_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut repo = MockUserRepository::new();
        let stored = user("hunter22", false);
        repo.expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));

        let service = UserService::new(Arc::new(repo));
        assert!(service.login("masuit", "hunter23").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_locked_user() {
        let mut repo = MockUserRepository::new();
        let stored = user("hunter22", true);
        repo.expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));

        let service = UserService::new(Arc::new(repo));
        assert!(service.login("masuit", "hunter22").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username().returning(|_| Ok(None));

        let service = UserService::new(Arc::new(repo));
        assert!(service.login("ghost", "pw").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let mut repo = MockUserRepository::new();
        repo.expect_create()
            .withf(|u| {
                u.username == "editor"
                    && u.nick_name == "editor"
                    && verify_password("long enough", &u.password_hash)
            })
            .times(1)
            .returning(|u| {
                Ok(User {
                    id: 2,
                    username: u.username,
                    nick_name: u.nick_name,
                    email: u.email,
                    password_hash: u.password_hash,
                    is_admin: u.is_admin,
                    avatar: None,
                    locked: false,
                    created_at: Utc::now(),
                    last_login_at: None,
                })
            });

        let service = UserService::new(Arc::new(repo));
        let created = service
            .create_user("editor", "", None, "long enough", false)
            .await
            .unwrap();
        assert_eq!(created.id, 2);
    }

    #[tokio::test]
    async fn test_create_user_rejects_short_password() {
        let repo = MockUserRepository::new();
        let service = UserService::new(Arc::new(repo));

        let err = service
            .create_user("editor", "", None, "short", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
