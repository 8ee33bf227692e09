//! Test helpers for service and API tests
//!
//! Provides an in-memory store implementing the repository traits so tests can
//! run without a database.

pub mod mock_repositories;

pub use mock_repositories::InMemoryStore;
