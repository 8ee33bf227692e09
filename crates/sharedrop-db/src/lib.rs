//! Sharedrop database layer
//!
//! Repository traits plus their PostgreSQL implementations. The `test-helpers`
//! feature adds an in-memory store implementing the same traits.

pub mod db;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use db::{
    PaymentRepository, PgPaymentRepository, PgUploadRepository, UploadRepository,
};
