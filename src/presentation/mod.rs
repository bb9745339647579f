pub mod auth;
pub mod error;
pub mod handlers;
pub mod request_id;
