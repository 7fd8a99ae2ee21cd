//! snipbox-axum - HTTP surface for the snipbox application
//!
//! Wires the core session/CSRF/validation machinery into axum: the ordered
//! middleware chains, the router, the request-scoped session handle and
//! authentication fact, and the page handlers.

mod config;
mod error;
mod handlers;
mod middleware;
mod router;
mod session;

pub use router::{app_router, protected_routes, session_routes, standard_chain};
pub use session::{AuthState, Session};

pub use snipbox::init;
