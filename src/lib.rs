//! Core library for now-playing-proxy
pub mod config;
pub mod db;
pub mod store;
pub mod models;
pub mod error;
pub mod api;
pub mod cache;
pub mod format;
pub mod proxy;
pub mod server;
