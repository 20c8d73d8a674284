pub mod api;
pub mod articles;
pub mod auth;
pub mod blob;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod state;
pub mod store;
pub mod users;
