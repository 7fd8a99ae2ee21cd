//! snipbox - request-pipeline core for the snipbox snippet-sharing application
//!
//! This crate holds the framework-free pieces of the application: the
//! form-validation accumulator, the server-side session and CSRF protocol,
//! the cache-store adapter the sessions live in, and the user and snippet
//! repositories. The HTTP surface lives in the companion `snipbox-axum` crate.

mod session;
mod snippets;
mod storage;
mod userdb;
mod utils;
mod validator;

pub use session::{
    SESSION_COOKIE_NAME, SESSION_IDLE_TIMEOUT, SESSION_TTL, SessionData, SessionError,
    destroy_session, load_session, new_csrf_token, new_session_data, new_session_id, save_session,
    verify_csrf_token,
};

pub use snippets::{Snippet, SnippetError, SnippetStore};

pub use userdb::{User, UserError, UserStore};

pub use utils::{UtilError, gen_random_string, header_set_cookie};

pub use validator::{EMAIL_RX, FieldCursor, Validator};

#[cfg(test)]
pub(crate) mod test_utils;

/// Initialize the underlying stores
///
/// Must be called once at startup before any session, user or snippet
/// operation. Creates the database tables if they do not exist yet.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    storage::GENERIC_CACHE_STORE.init().await?;
    userdb::init().await?;
    snippets::init().await?;
    Ok(())
}
