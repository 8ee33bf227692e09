//! Data models for the application
//!
//! Entities persisted by the repositories plus the request/response DTOs used
//! by the HTTP layer.

mod payment;
mod upload;

pub use payment::*;
pub use upload::*;
