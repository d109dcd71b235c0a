//! HTTP client for the remote feature-flag service

pub mod client;
pub mod error;
pub mod features;

pub use client::{Client, RetryConfig};
pub use error::ApiError;
pub use features::{FeatureToggle, FeaturesApi};
