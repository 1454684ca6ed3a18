pub mod config;
pub mod redis_bus;

pub use config::ServiceConfig;
pub use redis_bus::RedisBus;
