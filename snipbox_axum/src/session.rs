use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use http::HeaderMap;

use snipbox::{
    SESSION_COOKIE_NAME, SessionData, SessionError, destroy_session, header_set_cookie,
    new_csrf_token, new_session_data, new_session_id, save_session,
};

/// Request-scoped authentication fact, derived once per request by the
/// `authenticate` middleware and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// The authenticate middleware did not run for this request.
    Unknown,
    Anonymous,
    Authenticated(i64),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            AuthState::Authenticated(id) => Some(*id),
            _ => None,
        }
    }
}

struct SessionInner {
    /// Token the session was loaded under; `None` until first persisted.
    id: Option<String>,
    data: SessionData,
    dirty: bool,
    renewed: bool,
    /// Tokens invalidated by renewal, destroyed at commit.
    stale_ids: Vec<String>,
}

/// Handle to the per-request session, shared between middleware and handler
/// through request extensions.
///
/// Mutations accumulate in memory; the `session_manager` middleware commits
/// them to the store once the handler has produced its response. Concurrent
/// requests sharing a token race with last-write-wins semantics.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    pub(crate) fn new(id: Option<String>, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id,
                data,
                dirty: false,
                renewed: false,
                stale_ids: Vec::new(),
            })),
        }
    }

    /// Fresh anonymous session, not yet persisted.
    pub(crate) fn fresh() -> Result<Self, SessionError> {
        Ok(Self::new(None, new_session_data()?))
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.lock().data.user_id
    }

    /// The session's CSRF token, for embedding in form markup.
    ///
    /// Marks the session dirty: a page that renders the token must persist
    /// the session the submitted token will be verified against.
    pub fn csrf_token(&self) -> String {
        let mut inner = self.lock();
        inner.dirty = true;
        inner.data.csrf_token.clone()
    }

    pub fn put_flash(&self, message: &str) {
        let mut inner = self.lock();
        inner.data.flash = Some(message.to_string());
        inner.dirty = true;
    }

    /// Pop the flash message; it renders once and is gone.
    pub fn take_flash(&self) -> Option<String> {
        let mut inner = self.lock();
        let flash = inner.data.flash.take();
        if flash.is_some() {
            inner.dirty = true;
        }
        flash
    }

    /// Remember where an unauthenticated request wanted to go.
    pub fn set_redirect_to(&self, path: &str) {
        let mut inner = self.lock();
        inner.data.redirect_to = Some(path.to_string());
        inner.dirty = true;
    }

    pub fn take_redirect_to(&self) -> Option<String> {
        let mut inner = self.lock();
        let target = inner.data.redirect_to.take();
        if target.is_some() {
            inner.dirty = true;
        }
        target
    }

    /// Bind the session to a freshly authenticated user. Renews the token.
    pub fn log_in(&self, user_id: i64) -> Result<(), SessionError> {
        let mut inner = self.lock();
        Self::renew_locked(&mut inner)?;
        inner.data.user_id = Some(user_id);
        Ok(())
    }

    /// Drop the authenticated identity. Renews the token.
    pub fn log_out(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        Self::renew_locked(&mut inner)?;
        inner.data.user_id = None;
        Ok(())
    }

    /// Renew on privilege change without touching the identity (password
    /// change). The old token and CSRF token are both invalidated.
    pub fn renew(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        Self::renew_locked(&mut inner)
    }

    fn renew_locked(inner: &mut SessionInner) -> Result<(), SessionError> {
        if let Some(old) = inner.id.take() {
            inner.stale_ids.push(old);
        }
        inner.data.csrf_token = new_csrf_token()?;
        inner.data.expires_at = Utc::now() + Duration::seconds(inner.data.ttl as i64);
        inner.renewed = true;
        inner.dirty = true;
        Ok(())
    }

    /// Write accumulated mutations to the store.
    ///
    /// Returns `Set-Cookie` headers when a new token was issued. The lock is
    /// never held across store I/O.
    pub(crate) async fn commit(&self) -> Result<Option<HeaderMap>, SessionError> {
        let (dirty, renewed, id, stale_ids, mut data) = {
            let mut inner = self.lock();
            let stale = std::mem::take(&mut inner.stale_ids);
            (
                inner.dirty,
                inner.renewed,
                inner.id.clone(),
                stale,
                inner.data.clone(),
            )
        };

        for stale in &stale_ids {
            destroy_session(stale).await?;
        }

        if !dirty {
            return Ok(None);
        }

        match (renewed, id) {
            // Untouched token with prior identity on disk: save in place
            (false, Some(id)) => {
                save_session(&id, &mut data).await?;
                Ok(None)
            }
            // Renewed or first persisted: issue a new token
            _ => {
                let new_id = new_session_id()?;
                save_session(&new_id, &mut data).await?;

                let mut inner = self.lock();
                inner.id = Some(new_id.clone());
                inner.renewed = false;
                drop(inner);

                let max_age = (data.expires_at - Utc::now()).num_seconds().max(0);
                let mut headers = HeaderMap::new();
                header_set_cookie(&mut headers, &SESSION_COOKIE_NAME, &new_id, max_age)?;
                Ok(Some(headers))
            }
        }
    }
}
