pub mod debug_handler;
pub mod user_handler;
