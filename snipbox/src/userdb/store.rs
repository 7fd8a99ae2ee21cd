use chrono::Utc;

use crate::storage::DATA_STORE;
use crate::userdb::errors::UserError;
use crate::userdb::password::{hash_password, verify_password};
use crate::userdb::types::User;

/// User repository over the shared SQLite data store.
pub struct UserStore;

impl UserStore {
    pub(crate) async fn init() -> Result<(), UserError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&*DATA_STORE)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Register a new account. A second account with the same e-mail is
    /// reported as [`UserError::DuplicateEmail`].
    pub async fn create_user(name: &str, email: &str, password: &str) -> Result<User, UserError> {
        let hashed = hash_password(password)?;
        let now = Utc::now();

        let result = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (name, email, hashed_password, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&hashed)
        .bind(now)
        .fetch_one(&*DATA_STORE)
        .await;

        let id = match result {
            Ok(id) => id,
            Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
                return Err(UserError::DuplicateEmail);
            }
            Err(e) => return Err(UserError::Storage(e.to_string())),
        };

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
        })
    }

    /// Verify an e-mail/password pair and return the account id.
    ///
    /// Unknown e-mail and wrong password both come back as
    /// [`UserError::InvalidCredentials`]; callers cannot tell the two apart.
    pub async fn authenticate(email: &str, password: &str) -> Result<i64, UserError> {
        let row = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT id, hashed_password FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&*DATA_STORE)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

        let Some((id, hashed)) = row else {
            return Err(UserError::InvalidCredentials);
        };

        if !verify_password(password, &hashed) {
            return Err(UserError::InvalidCredentials);
        }

        Ok(id)
    }

    /// Existence check backing the per-request auth gate. Storage failures
    /// propagate so the caller can fail closed.
    pub async fn exists(id: i64) -> Result<bool, UserError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)
            "#,
        )
        .bind(id)
        .fetch_one(&*DATA_STORE)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))
    }

    pub async fn get_user(id: i64) -> Result<Option<User>, UserError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at FROM users WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&*DATA_STORE)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))
    }

    /// Change a password after re-verifying the current one. A wrong current
    /// password is [`UserError::InvalidCredentials`].
    pub async fn update_password(
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        let hashed = sqlx::query_scalar::<_, String>(
            r#"
            SELECT hashed_password FROM users WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&*DATA_STORE)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?
        .ok_or(UserError::NotFound)?;

        if !verify_password(current_password, &hashed) {
            return Err(UserError::InvalidCredentials);
        }

        let new_hashed = hash_password(new_password)?;
        sqlx::query(
            r#"
            UPDATE users SET hashed_password = ? WHERE id = ?
            "#,
        )
        .bind(&new_hashed)
        .bind(id)
        .execute(&*DATA_STORE)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Remove an account. Exists so tests can model a deleted user whose
    /// session still names them.
    pub async fn delete_user(id: i64) -> Result<(), UserError> {
        sqlx::query(
            r#"
            DELETE FROM users WHERE id = ?
            "#,
        )
        .bind(id)
        .execute(&*DATA_STORE)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_environment;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_create_and_authenticate() {
        init_test_environment().await;

        let user = UserStore::create_user("Alice", "alice-auth@example.com", "pa$$word123")
            .await
            .unwrap();
        assert_eq!(user.email, "alice-auth@example.com");

        let id = UserStore::authenticate("alice-auth@example.com", "pa$$word123")
            .await
            .unwrap();
        assert_eq!(id, user.id);
    }

    #[tokio::test]
    #[serial]
    async fn test_authenticate_wrong_password() {
        init_test_environment().await;

        UserStore::create_user("Bob", "bob-wrongpw@example.com", "correct-password")
            .await
            .unwrap();

        let result = UserStore::authenticate("bob-wrongpw@example.com", "wrong-password").await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    #[serial]
    async fn test_authenticate_unknown_email() {
        init_test_environment().await;

        let result = UserStore::authenticate("nobody@example.com", "whatever").await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    #[serial]
    async fn test_duplicate_email() {
        init_test_environment().await;

        UserStore::create_user("Carol", "carol-dup@example.com", "password1")
            .await
            .unwrap();
        let result = UserStore::create_user("Carol Again", "carol-dup@example.com", "password2")
            .await;
        assert!(matches!(result, Err(UserError::DuplicateEmail)));
    }

    #[tokio::test]
    #[serial]
    async fn test_exists() {
        init_test_environment().await;

        let user = UserStore::create_user("Dave", "dave-exists@example.com", "password1")
            .await
            .unwrap();

        assert!(UserStore::exists(user.id).await.unwrap());
        assert!(!UserStore::exists(99_999_999).await.unwrap());
    }

    #[tokio::test]
    #[serial]
    async fn test_exists_after_delete() {
        init_test_environment().await;

        let user = UserStore::create_user("Eve", "eve-deleted@example.com", "password1")
            .await
            .unwrap();
        UserStore::delete_user(user.id).await.unwrap();

        assert!(!UserStore::exists(user.id).await.unwrap());
    }

    #[tokio::test]
    #[serial]
    async fn test_get_user() {
        init_test_environment().await;

        let user = UserStore::create_user("Grace", "grace-get@example.com", "password1")
            .await
            .unwrap();

        let fetched = UserStore::get_user(user.id)
            .await
            .unwrap()
            .expect("user should exist");
        assert_eq!(fetched.name, "Grace");
        assert_eq!(fetched.email, "grace-get@example.com");

        assert!(UserStore::get_user(99_999_999).await.unwrap().is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_update_password() {
        init_test_environment().await;

        let user = UserStore::create_user("Frank", "frank-pw@example.com", "old-password")
            .await
            .unwrap();

        // Wrong current password is rejected and changes nothing
        let result = UserStore::update_password(user.id, "not-the-password", "new-password").await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
        assert!(
            UserStore::authenticate("frank-pw@example.com", "old-password")
                .await
                .is_ok()
        );

        UserStore::update_password(user.id, "old-password", "new-password")
            .await
            .unwrap();

        assert!(
            UserStore::authenticate("frank-pw@example.com", "new-password")
                .await
                .is_ok()
        );
        assert!(matches!(
            UserStore::authenticate("frank-pw@example.com", "old-password").await,
            Err(UserError::InvalidCredentials)
        ));
    }
}
