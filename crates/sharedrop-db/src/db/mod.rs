//! Database repositories for data access layer
//!
//! `uploads` owns `stored_files`, `text_blocks`, and at most one `payments` row;
//! deleting an upload cascades to all three.

pub mod payment;
pub mod upload;

pub use payment::{PaymentRepository, PgPaymentRepository};
pub use upload::{PgUploadRepository, UploadRepository};
