pub mod claims;
pub mod registration;
pub mod user;
