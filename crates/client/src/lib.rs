//! Tavola client library.
//!
//! Everything a front end needs besides rendering:
//!
//! - [`api`] - Typed calls for every REST endpoint, decoding the shared
//!   error envelope into [`ClientError::Api`]
//! - [`editor`] - Per-tab edit buffers for the restaurant profile screen
//! - [`assignment`] - The role/location assignment form for staff users
//! - [`postal`] - Address lookup by CEP (ViaCEP)
//! - [`storage`] - Persisted client state (auth, registration draft)
//! - [`generation`] - Request-generation tokens that drop stale responses
//! - [`debounce`] and [`slug`] - Debounced URL-slug availability checks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod assignment;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod generation;
pub mod postal;
pub mod slug;
pub mod storage;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use editor::{ProfileEditor, Tab};
pub use error::ClientError;
pub use generation::{Generation, RequestGeneration};
