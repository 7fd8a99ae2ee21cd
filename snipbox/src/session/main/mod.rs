mod csrf;
mod session;

pub use csrf::{new_csrf_token, verify_csrf_token};
pub use session::{
    destroy_session, load_session, new_session_data, new_session_id, save_session,
};
