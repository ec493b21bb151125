//! # Authentication Module
//!
//! Session token issuance and validation, plus the middleware that guards
//! protected routes. Tokens travel in an HTTP-only cookie.

pub mod jwt;
pub mod middleware;
pub mod models;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";
