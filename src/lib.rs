pub mod arr;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod http;
pub mod library;
pub mod media_server;
pub mod models;
pub mod playback;
pub mod radarr;
pub mod sonarr;
pub mod store;

#[cfg(test)]
pub mod testing;
