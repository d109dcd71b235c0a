//! Provider trait and request/response types
//!
//! A provider is the registry mapping resource type names to resource
//! implementations. It is constructed once at process start, configured once
//! with the provider block (credentials, endpoint), and then asked for
//! resource instances by type name.

use crate::context::Context;
use crate::error::Result;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Schema of the provider configuration block
    fn schema(&self) -> Schema;

    /// Called once with the provider block before any resource operation
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Instantiate (and configure) the resource registered under `type_name`.
    /// Fails for unknown type names or when the provider is not configured.
    async fn create_resource(&self, ctx: Context, type_name: &str) -> Result<Box<dyn Resource>>;

    /// Schemas of all registered resources, keyed by type name
    async fn resource_schemas(&self) -> HashMap<String, Schema>;
}

pub struct ConfigureProviderRequest {
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
}
