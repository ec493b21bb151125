//! # Services Module
//!
//! Request-independent logic used by the route handlers.

pub mod food_query;
