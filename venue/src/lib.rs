//! Venue Library
//!
//! Tracks the deployments of one Vercel project and reflects their status in
//! a tray indicator.

pub mod app;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod tray;
pub mod utils;
pub mod workers;
