pub mod app;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod services;
