pub mod channel;
pub mod handler;
pub mod hub;
