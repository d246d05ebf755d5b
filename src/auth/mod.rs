//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Email one-time passcode issuance and verification
//! - Google ID token sign-in
//! - JWT session token generation and validation
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
