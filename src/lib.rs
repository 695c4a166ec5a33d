//! Rusty Relay - A WebRTC signaling relay implemented in Rust
//!
//! This library tracks room membership and forwards session descriptions,
//! connectivity candidates and chat between peers over WebSocket. It carries
//! no media itself.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;

// Re-export main components
pub use config::*;
pub use constants::*;
