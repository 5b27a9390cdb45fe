//! Core types and configuration for the liquidation map pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (raw rows, canonical samples and series)
//! - Entry, leverage, liquidation, bucket and direction value types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
