//! tfcore - core plugin-framework types for Terraform providers in Rust
//!
//! Provides the vocabulary a provider is written against: dynamic values,
//! schemas with validation, diagnostics, request-scoped contexts, and the
//! Provider/Resource traits. The plugin RPC transport and process serving
//! live outside this crate.

pub mod context;
pub mod error;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod types;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfcoreError};
pub use provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider};
pub use resource::{Resource, ResourceWithConfigure};
pub use schema::{validate_config, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{
    has_errors, AttributePath, Config, Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue,
    State,
};
