//! Payment state machine
//!
//! An upload's attempt moves `pending -> completed | failed`; `completed` is
//! terminal and grants lifetime access. Both the client checkout callback and the
//! provider webhook can drive completion.

pub mod provider;
pub mod service;
pub mod signature;

pub use provider::{OrderRequest, PaymentProvider, ProviderOrder, RazorpayClient};
pub use service::PaymentService;
pub use signature::SignatureError;
