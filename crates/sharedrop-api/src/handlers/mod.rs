pub mod bundle;
pub mod history;
pub mod payments;
pub mod upload_create;
pub mod upload_delete;
pub mod upload_get;
pub mod upload_password;
