pub mod constants;
pub mod timeouts;
