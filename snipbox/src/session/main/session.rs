use chrono::{Duration, Utc};

use crate::session::config::{SESSION_IDLE_TIMEOUT, SESSION_TTL};
use crate::session::errors::SessionError;
use crate::session::types::SessionData;
use crate::storage::GENERIC_CACHE_STORE;
use crate::utils::gen_random_string;

use super::csrf::new_csrf_token;

/// Allocate a fresh opaque session token.
///
/// Renewal on privilege change (login, logout, password change) allocates a
/// new token with this and destroys the old one, so a fixated
/// pre-authentication token never survives into an authenticated session.
pub fn new_session_id() -> Result<String, SessionError> {
    Ok(gen_random_string(32)?)
}

/// Build the server-side state for a session that does not exist yet.
///
/// Nothing is persisted here; the session is only written to the store once
/// a response actually needs it (a flash message, a login, a CSRF-bearing
/// form).
pub fn new_session_data() -> Result<SessionData, SessionError> {
    let now = Utc::now();
    Ok(SessionData {
        user_id: None,
        csrf_token: new_csrf_token()?,
        flash: None,
        redirect_to: None,
        expires_at: now + Duration::seconds(*SESSION_TTL as i64),
        last_active: now,
        ttl: *SESSION_TTL,
    })
}

/// Load a session by token, enforcing absolute and idle expiry lazily.
///
/// Unknown, expired and idle-timed-out tokens all read as `None`; expired
/// state is removed from the store on the way out. Storage failures are
/// errors, never a silent `None`.
pub async fn load_session(session_id: &str) -> Result<Option<SessionData>, SessionError> {
    let cached = GENERIC_CACHE_STORE
        .get("session", session_id)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;

    let Some(cached) = cached else {
        return Ok(None);
    };

    let data: SessionData = cached.try_into()?;

    let now = Utc::now();
    let idle_deadline = data.last_active + Duration::seconds(*SESSION_IDLE_TIMEOUT as i64);
    if data.expires_at <= now || idle_deadline <= now {
        tracing::debug!("Session {} expired, removing", session_id);
        destroy_session(session_id).await?;
        return Ok(None);
    }

    Ok(Some(data))
}

/// Persist a session under `session_id`, refreshing its idle clock.
///
/// The store TTL is the remaining absolute lifetime, so the entry disappears
/// on its own even if never read again.
pub async fn save_session(session_id: &str, data: &mut SessionData) -> Result<(), SessionError> {
    let now = Utc::now();
    data.last_active = now;

    let remaining = (data.expires_at - now).num_seconds().max(1) as usize;

    GENERIC_CACHE_STORE
        .put_with_ttl("session", session_id, data.clone().into(), remaining)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))
}

pub async fn destroy_session(session_id: &str) -> Result<(), SessionError> {
    GENERIC_CACHE_STORE
        .remove("session", session_id)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_environment;
    use serial_test::serial;

    #[test]
    fn test_new_session_id_is_unique() {
        let a = new_session_id().unwrap();
        let b = new_session_id().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_new_session_data_is_anonymous_with_csrf() {
        let data = new_session_data().unwrap();
        assert!(data.user_id.is_none());
        assert!(data.flash.is_none());
        assert!(data.redirect_to.is_none());
        assert!(!data.csrf_token.is_empty());
        assert!(data.expires_at > Utc::now());
    }

    #[tokio::test]
    #[serial]
    async fn test_save_then_load_roundtrip() {
        init_test_environment().await;

        let session_id = new_session_id().unwrap();
        let mut data = new_session_data().unwrap();
        data.user_id = Some(7);
        data.flash = Some("hello".to_string());

        save_session(&session_id, &mut data).await.unwrap();

        let loaded = load_session(&session_id)
            .await
            .unwrap()
            .expect("session should exist");
        assert_eq!(loaded.user_id, Some(7));
        assert_eq!(loaded.flash.as_deref(), Some("hello"));
        assert_eq!(loaded.csrf_token, data.csrf_token);
    }

    #[tokio::test]
    #[serial]
    async fn test_load_unknown_session_is_none() {
        init_test_environment().await;
        assert!(load_session("no-such-token").await.unwrap().is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_absolutely_expired_session_reads_as_none() {
        init_test_environment().await;

        let session_id = new_session_id().unwrap();
        let mut data = new_session_data().unwrap();
        data.expires_at = Utc::now() - Duration::seconds(10);

        // Write directly so save_session cannot rescue the entry
        GENERIC_CACHE_STORE
            .put("session", &session_id, data.into())
            .await
            .unwrap();

        assert!(load_session(&session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_idle_timed_out_session_reads_as_none() {
        init_test_environment().await;

        let session_id = new_session_id().unwrap();
        let mut data = new_session_data().unwrap();
        data.last_active = Utc::now() - Duration::seconds(*SESSION_IDLE_TIMEOUT as i64 + 60);

        GENERIC_CACHE_STORE
            .put("session", &session_id, data.into())
            .await
            .unwrap();

        assert!(load_session(&session_id).await.unwrap().is_none());
    }

    /// Session store calls run concurrently; nothing serializes them behind
    /// a process-wide lock.
    #[tokio::test]
    #[serial]
    async fn test_concurrent_session_store_access() {
        init_test_environment().await;

        let id_a = new_session_id().unwrap();
        let id_b = new_session_id().unwrap();
        let mut data_a = new_session_data().unwrap();
        let mut data_b = new_session_data().unwrap();
        data_a.user_id = Some(1);
        data_b.user_id = Some(2);

        let (saved_a, saved_b) = tokio::join!(
            save_session(&id_a, &mut data_a),
            save_session(&id_b, &mut data_b),
        );
        saved_a.unwrap();
        saved_b.unwrap();

        let (loaded_a, loaded_b) = tokio::join!(load_session(&id_a), load_session(&id_b));
        assert_eq!(loaded_a.unwrap().unwrap().user_id, Some(1));
        assert_eq!(loaded_b.unwrap().unwrap().user_id, Some(2));
    }

    #[tokio::test]
    #[serial]
    async fn test_destroyed_session_reads_as_none() {
        init_test_environment().await;

        let session_id = new_session_id().unwrap();
        let mut data = new_session_data().unwrap();
        save_session(&session_id, &mut data).await.unwrap();

        destroy_session(&session_id).await.unwrap();

        assert!(load_session(&session_id).await.unwrap().is_none());
    }
}
