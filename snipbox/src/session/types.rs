use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::errors::SessionError;
use crate::storage::CacheData;

/// Server-side session state, stored as JSON in the cache store and keyed by
/// the opaque token held in the client's cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Option<i64>,
    pub csrf_token: String,
    pub flash: Option<String>,
    pub redirect_to: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub ttl: u64,
}

impl From<SessionData> for CacheData {
    fn from(data: SessionData) -> Self {
        Self {
            value: serde_json::to_string(&data).expect("Failed to serialize SessionData"),
        }
    }
}

impl TryFrom<CacheData> for SessionData {
    type Error = SessionError;

    fn try_from(data: CacheData) -> Result<Self, Self::Error> {
        serde_json::from_str(&data.value).map_err(|e| SessionError::Storage(e.to_string()))
    }
}
