//! Dataweb daemon library - exposes modules for testing.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod poller;
pub mod routes;
pub mod scrape;
pub mod server;
