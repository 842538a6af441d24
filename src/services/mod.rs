pub mod gateway;
pub mod logger;
