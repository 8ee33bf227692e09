//! Sharedrop Services Layer
//!
//! Business services that sit between the HTTP handlers and the repositories:
//! the payment state machine and its provider client, CAPTCHA verification, and
//! the ZIP bundle builder.

pub mod captcha;
pub mod payment;

#[cfg(feature = "archive")]
pub mod archive;

#[cfg(feature = "archive")]
pub use archive::build_bundle;
pub use captcha::{create_captcha_verifier, CaptchaVerifier, DisabledCaptcha, RecaptchaVerifier};
pub use payment::{
    OrderRequest, PaymentProvider, PaymentService, ProviderOrder, RazorpayClient, SignatureError,
};
