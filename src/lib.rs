//! Real-time multi-room game-lobby coordination core.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod friends;
pub mod keepalive;
pub mod launch;
pub mod middleware;
pub mod models;
pub mod presence;
pub mod registry;
pub mod room;
pub mod sanitize;
pub mod state;
pub mod ws;
