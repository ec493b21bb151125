// # Routes Module
//
// - HTTP route handlers, grouped by resource.
// - Handlers are mounted by the route table in `server.rs`; auth
//   requirements are declared there, not here.

/// Health check endpoint
pub mod health;

/// Food browsing and mutation
pub mod foods;

/// Order placement
pub mod orders;

/// User listing and registration
pub mod users;

/// Session token issuance and logout
pub mod auth;
