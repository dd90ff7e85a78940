//! Umami Analytics Domain Module
//!
//! This module contains everything needed to query an Umami server:
//! - The authenticated REST client
//! - Shape-tolerant response decoders
//! - Normalized result models
//! - Upstream error types

pub mod client;
pub mod decode;
pub mod error;
pub mod models;

// Re-export commonly used types for convenience
pub use client::UmamiClient;
pub use error::{UmamiError, UmamiResult};
pub use models::{MetricPoint, PageViewPoint, Stats, ValueChange, Website};
