pub mod api;
pub mod config;
pub mod keys;
pub mod maintenance;
