pub mod catalog;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod server;
