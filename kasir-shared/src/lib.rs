//! # Kasir Shared Library
//!
//! Types, persistence and business logic shared by the Kasir API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and role capabilities
//! - `store`: Record store trait with PostgreSQL and in-memory implementations
//! - `provisioning`: Binding external identities to local accounts
//! - `auth`: Identity tokens and authorization checks
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod provisioning;
pub mod store;

/// Current version of the Kasir shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
