//! HTTP middleware for the API.
//!
//! Layer order, outermost first: Sentry, `TraceLayer`, sessions. The auth
//! extractors in [`auth`] read the session that the session layer loads.

pub mod auth;
pub mod session;

pub use auth::{OptionalStaff, RequireStaff};
pub use session::{SESSION_COOKIE_NAME, SessionSetupError, create_session_layer};
