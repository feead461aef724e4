pub mod cdn;
pub mod config;
pub mod copy;
pub mod error;
pub mod event;
pub mod handler;
pub mod maven;
pub mod server;
pub mod store;
pub mod util;
