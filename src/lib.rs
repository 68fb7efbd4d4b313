pub mod auth;
pub mod bot;
pub mod config;
pub mod database;
pub mod stats;
pub mod utils;
