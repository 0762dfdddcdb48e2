//! Tavola server library.
//!
//! The JSON REST API for restaurant administration: registration,
//! restaurant profiles with their locations, media, languages and payment
//! settings, and staff users with role/location assignments.
//!
//! Exposed as a library so the CLI and the integration tests can reuse the
//! repositories, services and migrations.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;
