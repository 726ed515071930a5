//! Shared utilities for stock-predictor
//!
//! This crate provides common functionality used across the workspace:
//! tracing setup and the application-level configuration the front ends
//! share.

pub mod config;
pub mod logging;

pub use config::{Config, LogFormat};
pub use logging::init_tracing;
