mod config;
mod errors;
mod main;
mod types;

pub use config::{SESSION_COOKIE_NAME, SESSION_IDLE_TIMEOUT, SESSION_TTL};
pub use errors::SessionError;
pub use main::{
    destroy_session, load_session, new_csrf_token, new_session_data, new_session_id, save_session,
    verify_csrf_token,
};
pub use types::SessionData;
