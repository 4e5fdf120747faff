//! # atende-channels
//!
//! WhatsApp automation clients for atende.

pub mod bridge;

pub use bridge::BridgeClient;
