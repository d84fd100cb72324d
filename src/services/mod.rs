pub mod cleanup_service;
pub mod rate_limit_service;
