use chrono::{Duration, Utc};

use crate::snippets::errors::SnippetError;
use crate::snippets::types::Snippet;
use crate::storage::DATA_STORE;

/// Snippet repository over the shared SQLite data store. Expired snippets
/// are filtered at read time, not deleted.
pub struct SnippetStore;

impl SnippetStore {
    pub(crate) async fn init() -> Result<(), SnippetError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snippets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                expires_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&*DATA_STORE)
        .await
        .map_err(|e| SnippetError::Storage(e.to_string()))?;

        Ok(())
    }

    pub async fn insert(
        title: &str,
        content: &str,
        expires_days: i64,
    ) -> Result<i64, SnippetError> {
        let now = Utc::now();
        let expires_at = now + Duration::days(expires_days);

        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO snippets (title, content, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(now)
        .bind(expires_at)
        .fetch_one(&*DATA_STORE)
        .await
        .map_err(|e| SnippetError::Storage(e.to_string()))
    }

    pub async fn get(id: i64) -> Result<Option<Snippet>, SnippetError> {
        sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created_at, expires_at
            FROM snippets
            WHERE id = ? AND expires_at > ?
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&*DATA_STORE)
        .await
        .map_err(|e| SnippetError::Storage(e.to_string()))
    }

    /// The ten newest unexpired snippets, newest first.
    pub async fn latest() -> Result<Vec<Snippet>, SnippetError> {
        sqlx::query_as::<_, Snippet>(
            r#"
            SELECT id, title, content, created_at, expires_at
            FROM snippets
            WHERE expires_at > ?
            ORDER BY id DESC
            LIMIT 10
            "#,
        )
        .bind(Utc::now())
        .fetch_all(&*DATA_STORE)
        .await
        .map_err(|e| SnippetError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_environment;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_insert_and_get() {
        init_test_environment().await;

        let id = SnippetStore::insert("O snail", "Climb Mount Fuji", 7)
            .await
            .unwrap();

        let snippet = SnippetStore::get(id).await.unwrap().expect("exists");
        assert_eq!(snippet.title, "O snail");
        assert_eq!(snippet.content, "Climb Mount Fuji");
        assert!(snippet.expires_at > snippet.created_at);
    }

    #[tokio::test]
    #[serial]
    async fn test_get_unknown_is_none() {
        init_test_environment().await;
        assert!(SnippetStore::get(99_999_999).await.unwrap().is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_expired_snippet_is_invisible() {
        init_test_environment().await;

        // expires_days of zero puts the deadline at insert time
        let id = SnippetStore::insert("ephemeral", "gone", 0).await.unwrap();

        assert!(SnippetStore::get(id).await.unwrap().is_none());
        let latest = SnippetStore::latest().await.unwrap();
        assert!(latest.iter().all(|s| s.id != id));
    }

    #[tokio::test]
    #[serial]
    async fn test_latest_orders_newest_first() {
        init_test_environment().await;

        let first = SnippetStore::insert("first", "a", 7).await.unwrap();
        let second = SnippetStore::insert("second", "b", 7).await.unwrap();

        let latest = SnippetStore::latest().await.unwrap();
        let pos_first = latest.iter().position(|s| s.id == first).unwrap();
        let pos_second = latest.iter().position(|s| s.id == second).unwrap();
        assert!(pos_second < pos_first);
        assert!(latest.len() <= 10);
    }
}
