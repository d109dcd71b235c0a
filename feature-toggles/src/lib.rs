//! Terraform provider for a feature-flag service
//!
//! The provider configuration block carries the service endpoint and API
//! token, each falling back to an environment variable. Configuration builds
//! the shared HTTP client; resources receive it through provider data.

pub mod api;
pub mod provider_data;
pub mod reconcile;
pub mod resources;
pub mod store;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use tfcore::context::Context;
use tfcore::error::{Result, TfcoreError};
use tfcore::provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider};
use tfcore::resource::{ConfigureResourceRequest, Resource, ResourceWithConfigure};
use tfcore::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfcore::types::{AttributePath, Diagnostic};

use provider_data::FeatureTogglesProviderData;
use resources::FeatureResource;

pub struct FeatureTogglesProvider {
    provider_data: Option<Arc<FeatureTogglesProviderData>>,
}

impl Default for FeatureTogglesProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureTogglesProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }
}

#[async_trait]
impl Provider for FeatureTogglesProvider {
    fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provider for managing feature toggles")
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Base URL of the feature-flag service (FEATURE_TOGGLES_ENDPOINT)")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_token", AttributeType::String)
                    .description("Bearer token for the service API (FEATURE_TOGGLES_API_TOKEN)")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification (FEATURE_TOGGLES_INSECURE)")
                    .optional()
                    .build(),
            )
            .build()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let endpoint = request
            .config
            .get_string(&AttributePath::new("endpoint"))
            .ok()
            .or_else(|| std::env::var("FEATURE_TOGGLES_ENDPOINT").ok());

        let api_token = request
            .config
            .get_string(&AttributePath::new("api_token"))
            .ok()
            .or_else(|| std::env::var("FEATURE_TOGGLES_API_TOKEN").ok());

        let insecure = request
            .config
            .get_bool(&AttributePath::new("insecure"))
            .ok()
            .or_else(|| {
                std::env::var("FEATURE_TOGGLES_INSECURE")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok())
            })
            .unwrap_or(false);

        let mut diagnostics = vec![];

        match (endpoint, api_token) {
            (Some(endpoint), Some(api_token)) => {
                match api::Client::new(&endpoint, &api_token, insecure) {
                    Ok(client) => {
                        self.provider_data =
                            Some(Arc::new(FeatureTogglesProviderData::new(Arc::new(client))));
                    }
                    Err(e) => {
                        diagnostics.push(Diagnostic::error(
                            "Failed to create API client",
                            format!("{}", e),
                        ));
                    }
                }
            }
            (None, _) => {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing endpoint",
                        "Set 'endpoint' in the provider block or the FEATURE_TOGGLES_ENDPOINT environment variable",
                    )
                    .with_attribute(AttributePath::new("endpoint")),
                );
            }
            (_, None) => {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing api_token",
                        "Set 'api_token' in the provider block or the FEATURE_TOGGLES_API_TOKEN environment variable",
                    )
                    .with_attribute(AttributePath::new("api_token")),
                );
            }
        }

        ConfigureProviderResponse { diagnostics }
    }

    async fn create_resource(&self, ctx: Context, type_name: &str) -> Result<Box<dyn Resource>> {
        let provider_data = self
            .provider_data
            .as_ref()
            .ok_or(TfcoreError::ProviderNotConfigured)?
            .clone();

        match type_name {
            "feature_toggles_feature" => {
                let mut resource = FeatureResource::new();
                let response = resource
                    .configure(
                        ctx,
                        ConfigureResourceRequest {
                            provider_data: Some(provider_data),
                        },
                    )
                    .await;
                if tfcore::types::has_errors(&response.diagnostics) {
                    return Err(TfcoreError::Custom(format!(
                        "failed to configure resource '{}'",
                        type_name
                    )));
                }
                Ok(Box::new(resource))
            }
            _ => Err(TfcoreError::Custom(format!(
                "unknown resource type: {}",
                type_name
            ))),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, Schema>> = std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                let mut schemas = HashMap::new();
                schemas.insert(
                    "feature_toggles_feature".to_string(),
                    FeatureResource::schema_static(),
                );
                schemas
            })
            .clone()
    }
}
