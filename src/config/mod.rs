/// Database configuration and connection management
pub mod database;

/// Gateway settings loading from gateway.toml
pub mod gateway;
