//! Authentication module.
//!
//! Accounts with argon2 password hashes, and cookie sessions whose tokens
//! are stored only as SHA-256 digests.

use std::time::Duration;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::db::entities::{session, user};
use crate::db::unix_now;
use crate::error::{Result, ServerError};
use crate::forms::RegisterInput;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "qa_session";

/// A freshly created session; `token` is only ever seen here and in the cookie
#[derive(Clone, Debug)]
pub struct SessionToken {
    pub token: String,
    pub user: user::Model,
    pub expires_at: i64,
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// SHA-256 hex digest, used for stored session tokens
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// 64 hex chars from two v4 UUIDs
fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// CSRF token bound to a session token
pub fn csrf_token_for(session_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"qa-csrf:");
    hasher.update(session_token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a submitted CSRF token against the session it claims to belong to
pub fn verify_csrf_token(submitted: &str, session_token: Option<&str>) -> bool {
    let Some(session_token) = session_token else {
        return false;
    };
    let expected = csrf_token_for(session_token);
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

/// Account and session manager
#[derive(Clone)]
pub struct AuthManager {
    db: DatabaseConnection,
    session_ttl: Duration,
}

impl AuthManager {
    pub fn new(db: DatabaseConnection, session_ttl: Duration) -> Self {
        Self { db, session_ttl }
    }

    /// Create an account; the input must already be validated
    pub async fn register(&self, input: &RegisterInput) -> Result<user::Model> {
        let taken = user::Entity::find()
            .filter(
                user::Column::Username
                    .eq(input.username.as_str())
                    .or(user::Column::Email.eq(input.email.as_str())),
            )
            .one(&self.db)
            .await?;
        if let Some(existing) = taken {
            let what = if existing.username == input.username {
                "username"
            } else {
                "email"
            };
            return Err(ServerError::Conflict(format!("That {} is already taken", what)));
        }

        let now = unix_now();
        let new_user = user::ActiveModel {
            username: Set(input.username.clone()),
            email: Set(input.email.clone()),
            password_hash: Set(hash_password(&input.password)?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = new_user.insert(&self.db).await?;
        tracing::info!("Registered user '{}'", created.username);
        Ok(created)
    }

    /// Verify credentials and open a session
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<SessionToken> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(ServerError::AuthFailed)?;

        if !verify_password(password, &user.password_hash) {
            return Err(ServerError::AuthFailed);
        }

        let token = generate_token();
        let now = unix_now();
        let expires_at = now + self.session_ttl.as_secs() as i64;

        session::ActiveModel {
            user_id: Set(user.id),
            token_hash: Set(hash_token(&token)),
            created_at: Set(now),
            expires_at: Set(expires_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::debug!("Session opened for '{}'", user.username);
        Ok(SessionToken {
            token,
            user,
            expires_at,
        })
    }

    /// The signed-in user for a session token, if the session is still live
    pub async fn user_for_token(&self, token: &str) -> Result<Option<user::Model>> {
        let found = session::Entity::find()
            .filter(session::Column::TokenHash.eq(hash_token(token)))
            .filter(session::Column::ExpiresAt.gt(unix_now()))
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?;

        Ok(found.and_then(|(_, user)| user))
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        session::Entity::delete_many()
            .filter(session::Column::TokenHash.eq(hash_token(token)))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Remove expired sessions, returning how many were dropped
    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let res = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(unix_now()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;

    fn ferris() -> RegisterInput {
        RegisterInput::new("ferris", "ferris@example.com", "crab-rave", "crab-rave")
    }

    #[test]
    fn test_password_hash() {
        let hash = hash_password("test1234").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("test1234", &hash));
        assert!(!verify_password("different", &hash));
        assert!(!verify_password("test1234", "not-a-phc-string"));

        // Salted, so two hashes of the same password differ
        assert_ne!(hash, hash_password("test1234").unwrap());
    }

    #[test]
    fn test_csrf_token() {
        let token = generate_token();
        assert_eq!(token.len(), 64);

        let csrf = csrf_token_for(&token);
        assert!(verify_csrf_token(&csrf, Some(&token)));
        assert!(!verify_csrf_token(&csrf, Some("another-session")));
        assert!(!verify_csrf_token(&csrf, None));
        assert!(!verify_csrf_token("", Some(&token)));
        assert!(!verify_csrf_token(&csrf[..63], Some(&token)));
        assert!(!verify_csrf_token(&csrf.to_uppercase(), Some(&token)));
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let (_temp_dir, db) = test_database().await;
        let auth = AuthManager::new(db, Duration::from_secs(3600));

        let user = auth.register(&ferris()).await.unwrap();
        assert_ne!(user.password_hash, "crab-rave");

        let session = auth.authenticate("ferris", "crab-rave").await.unwrap();
        assert_eq!(session.user.id, user.id);

        let current = auth.user_for_token(&session.token).await.unwrap().unwrap();
        assert_eq!(current.username, "ferris");

        assert!(matches!(
            auth.authenticate("ferris", "wrong-password").await,
            Err(ServerError::AuthFailed)
        ));
        assert!(matches!(
            auth.authenticate("nobody", "crab-rave").await,
            Err(ServerError::AuthFailed)
        ));
        assert!(auth.user_for_token("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let (_temp_dir, db) = test_database().await;
        let auth = AuthManager::new(db, Duration::from_secs(3600));

        auth.register(&ferris()).await.unwrap();

        let same_name =
            RegisterInput::new("ferris", "other@example.com", "crab-rave", "crab-rave");
        assert!(matches!(
            auth.register(&same_name).await,
            Err(ServerError::Conflict(m)) if m.contains("username")
        ));

        let same_email =
            RegisterInput::new("corro", "ferris@example.com", "crab-rave", "crab-rave");
        assert!(matches!(
            auth.register(&same_email).await,
            Err(ServerError::Conflict(m)) if m.contains("email")
        ));
    }

    #[tokio::test]
    async fn test_logout_and_expiry() {
        let (_temp_dir, db) = test_database().await;
        let auth = AuthManager::new(db.clone(), Duration::from_secs(3600));
        auth.register(&ferris()).await.unwrap();

        let session = auth.authenticate("ferris", "crab-rave").await.unwrap();
        auth.logout(&session.token).await.unwrap();
        assert!(auth.user_for_token(&session.token).await.unwrap().is_none());

        // A zero TTL produces sessions that are expired on arrival
        let short = AuthManager::new(db, Duration::from_secs(0));
        let stale = short.authenticate("ferris", "crab-rave").await.unwrap();
        assert!(short.user_for_token(&stale.token).await.unwrap().is_none());
        assert_eq!(short.cleanup_expired_sessions().await.unwrap(), 1);
    }
}
