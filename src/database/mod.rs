//! # Database Module
//!
//! Document storage behind the `DocumentStore` trait: a PostgreSQL/JSONB
//! implementation for deployments and an in-memory one for tests and local
//! development. Typed models live in `models`.

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod store;

pub use connection::PgDocumentStore;
pub use memory::MemoryStore;
pub use store::DocumentStore;
