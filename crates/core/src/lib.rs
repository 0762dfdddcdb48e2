//! Tavola Core - Shared types library.
//!
//! This crate provides the types used across all Tavola components:
//! - `server` - REST API for restaurant administration
//! - `client` - Typed API client and client-side editing state
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types, validation rules and pure logic - no
//! I/O, no database access, no HTTP clients. This keeps it lightweight and
//! lets the server and the client enforce the same rules.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, statuses, restaurants, locations, languages, staff
//! - [`validation`] - Field format checks (phone, CEP, CNPJ, PIX, slugs, hours)
//! - [`api`] - The JSON error envelope shared by server and client

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod types;
pub mod validation;

pub use api::{ErrorBody, ErrorCode, ErrorEnvelope};
pub use types::*;
pub use validation::{FieldErrors, ValidationError};
