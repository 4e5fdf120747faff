//! # atende-core
//!
//! Core types, traits, configuration, and error handling for the atende bot.

pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod session;
pub mod traits;

pub use config::shellexpand;
