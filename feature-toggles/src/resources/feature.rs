//! Feature toggle resource implementation
//!
//! Each lifecycle entry point runs validation, then reconciliation, then the
//! store call, then rebuilds local state from the authoritative record the
//! service returned. The remote service owns the truth; local state is only
//! a mirror for the current operation cycle.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use tfcore::context::Context;
use tfcore::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfcore::schema::{
    validate_config, AttributeBuilder, AttributeType, ListLengthValidator, Schema, SchemaBuilder,
    StringLengthValidator,
};
use tfcore::types::{has_errors, AttributePath, Diagnostic, DynamicValue};

use crate::api::{ApiError, FeatureToggle};
use crate::reconcile::{reconcile, Plan};
use crate::store::FeatureStore;

#[derive(Default)]
pub struct FeatureResource {
    store: Option<Arc<dyn FeatureStore>>,
}

impl FeatureResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a resource bound to a store directly, bypassing provider
    /// configuration. Used by tests.
    pub fn with_store(store: Arc<dyn FeatureStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a feature toggle in the remote feature-flag service")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource identifier, always equal to the feature name")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Unique feature name; changing it forces recreation")
                    .required()
                    .requires_replace()
                    .validator(Box::new(StringLengthValidator {
                        min: Some(1),
                        max: None,
                    }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Human-readable description of the feature")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .description("Whether the feature is enabled")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "tags",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Free-form tags attached to the feature")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "environments",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Environments the feature applies to; at least one")
                .required()
                .validator(Box::new(ListLengthValidator {
                    min: Some(1),
                    max: None,
                }))
                .build(),
            )
            .build()
    }

    fn store(&self) -> Result<&Arc<dyn FeatureStore>, Diagnostic> {
        self.store.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not passed to the resource",
            )
        })
    }
}

/// Build the typed record from a configuration or state tree. Assumes the
/// tree already passed schema validation; absent optional fields default to
/// empty.
fn feature_from_value(value: &DynamicValue) -> Result<FeatureToggle, Diagnostic> {
    let name = value.get_string(&AttributePath::new("name")).map_err(|_| {
        Diagnostic::error("Missing name", "The 'name' attribute is required")
            .with_attribute(AttributePath::new("name"))
    })?;

    let enabled = value.get_bool(&AttributePath::new("enabled")).map_err(|_| {
        Diagnostic::error("Missing enabled", "The 'enabled' attribute is required")
            .with_attribute(AttributePath::new("enabled"))
    })?;

    let environments = value
        .get_string_list(&AttributePath::new("environments"))
        .map_err(|_| {
            Diagnostic::error(
                "Missing environments",
                "The 'environments' attribute is required",
            )
            .with_attribute(AttributePath::new("environments"))
        })?;

    let description = value
        .get_string(&AttributePath::new("description"))
        .unwrap_or_default();
    let tags = value
        .get_string_list(&AttributePath::new("tags"))
        .unwrap_or_default();

    Ok(FeatureToggle {
        name,
        description,
        enabled,
        tags,
        environments,
    })
}

/// Build the full state tree from an authoritative record. The identifier
/// always mirrors the feature name.
fn state_from_feature(feature: &FeatureToggle) -> DynamicValue {
    let mut state = DynamicValue::object(HashMap::new());
    // These writes only fail on malformed paths, which are constant here
    let _ = state.set_string(&AttributePath::new("id"), feature.name.clone());
    let _ = state.set_string(&AttributePath::new("name"), feature.name.clone());
    let _ = state.set_string(
        &AttributePath::new("description"),
        feature.description.clone(),
    );
    let _ = state.set_bool(&AttributePath::new("enabled"), feature.enabled);
    let _ = state.set_string_list(&AttributePath::new("tags"), feature.tags.clone());
    let _ = state.set_string_list(
        &AttributePath::new("environments"),
        feature.environments.clone(),
    );
    state
}

/// Name of the feature a state tree refers to. Falls back to the identifier
/// for states written before `name` was stored explicitly.
fn name_from_state(state: &DynamicValue) -> Option<String> {
    state
        .get_string(&AttributePath::new("name"))
        .or_else(|_| state.get_string(&AttributePath::new("id")))
        .ok()
}

#[async_trait]
impl Resource for FeatureResource {
    fn type_name(&self) -> &str {
        "feature_toggles_feature"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn create(
        &self,
        ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut diagnostics = validate_config(&Self::schema_static(), &request.config);
        if has_errors(&diagnostics) {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        if ctx.is_cancelled() {
            diagnostics.push(Diagnostic::error(
                "Operation cancelled",
                "Create was cancelled before contacting the feature-flag service",
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let store = match self.store() {
            Ok(store) => store,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let desired = match feature_from_value(&request.config) {
            Ok(feature) => feature,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        tracing::debug!("Creating feature '{}'", desired.name);

        match store.create(&desired).await {
            Ok(created) => CreateResourceResponse {
                new_state: state_from_feature(&created),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create feature",
                    format!("Remote service error: {}", e),
                ));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let name = match name_from_state(&request.current_state) {
            Some(name) => name,
            // State without a name cannot refer to anything remote; signal
            // the host to plan recreation
            None => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
        };

        let store = match self.store() {
            Ok(store) => store,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match store.fetch(&name).await {
            Ok(Some(feature)) => ReadResourceResponse {
                new_state: Some(state_from_feature(&feature)),
                diagnostics,
            },
            Ok(None) => {
                tracing::debug!("Feature '{}' no longer exists remotely", name);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read feature",
                    format!("Remote service error: {}", e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(
        &self,
        ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let mut diagnostics = validate_config(&Self::schema_static(), &request.config);
        if has_errors(&diagnostics) {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let store = match self.store() {
            Ok(store) => store.clone(),
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let desired = match feature_from_value(&request.config) {
            Ok(feature) => feature,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let prior = match feature_from_value(&request.prior_state) {
            Ok(feature) => feature,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        match reconcile(Some(&desired), Some(&prior)) {
            Plan::NoOp => UpdateResourceResponse {
                new_state: state_from_feature(&desired),
                diagnostics,
            },
            Plan::Replace => {
                diagnostics.push(
                    Diagnostic::error(
                        "Feature name is immutable",
                        format!(
                            "Cannot rename '{}' to '{}'; the resource must be replaced",
                            prior.name, desired.name
                        ),
                    )
                    .with_attribute(AttributePath::new("name")),
                );
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
            Plan::Update(diff) => {
                if ctx.is_cancelled() {
                    diagnostics.push(Diagnostic::error(
                        "Operation cancelled",
                        "Update was cancelled before contacting the feature-flag service",
                    ));
                    return UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics,
                    };
                }

                tracing::debug!("Applying diff to feature '{}': {:?}", prior.name, diff);

                match store.apply(&prior.name, &diff).await {
                    Ok(updated) => UpdateResourceResponse {
                        new_state: state_from_feature(&updated),
                        diagnostics,
                    },
                    Err(e) => {
                        diagnostics.push(Diagnostic::error(
                            "Failed to update feature",
                            format!("Remote service error: {}", e),
                        ));
                        // The apply may have landed partially; trust a fresh
                        // read of the service over the attempted diff
                        let new_state = match store.fetch(&prior.name).await {
                            Ok(Some(actual)) => state_from_feature(&actual),
                            _ => request.prior_state,
                        };
                        UpdateResourceResponse {
                            new_state,
                            diagnostics,
                        }
                    }
                }
            }
            // reconcile never yields these when both sides exist
            Plan::Create | Plan::Delete => {
                diagnostics.push(Diagnostic::error(
                    "Internal reconciliation error",
                    "Unexpected plan for an in-place update",
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(
        &self,
        ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let name = match name_from_state(&request.prior_state) {
            Some(name) => name,
            // Nothing to refer to remotely; treat as already deleted
            None => return DeleteResourceResponse { diagnostics },
        };

        if ctx.is_cancelled() {
            diagnostics.push(Diagnostic::error(
                "Operation cancelled",
                "Delete was cancelled before contacting the feature-flag service",
            ));
            return DeleteResourceResponse { diagnostics };
        }

        let store = match self.store() {
            Ok(store) => store,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        tracing::debug!("Deleting feature '{}'", name);

        match store.remove(&name).await {
            Ok(()) => DeleteResourceResponse { diagnostics },
            Err(ApiError::NotFound(_)) => {
                // Already gone remotely; deletion is idempotent
                tracing::debug!("Feature '{}' was already deleted", name);
                DeleteResourceResponse { diagnostics }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete feature",
                    format!("Remote service error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for FeatureResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match request.provider_data {
            Some(data) => {
                match data.downcast_ref::<crate::provider_data::FeatureTogglesProviderData>() {
                    Some(provider_data) => {
                        self.store = Some(provider_data.store.clone());
                    }
                    None => {
                        diagnostics.push(Diagnostic::error(
                            "Invalid provider data",
                            "Failed to extract FeatureTogglesProviderData from provider data",
                        ));
                    }
                }
            }
            None => {
                diagnostics.push(Diagnostic::error(
                    "No provider data",
                    "No provider data was passed to the resource",
                ));
            }
        }

        ConfigureResourceResponse { diagnostics }
    }
}
