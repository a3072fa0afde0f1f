pub mod config;
pub mod events;
pub mod geometry;
pub mod location;
pub mod server;
