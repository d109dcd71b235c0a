//! Remote store boundary for feature toggles
//!
//! [`FeatureStore`] is the interface the resource lifecycle talks to; the
//! HTTP [`Client`](crate::api::Client) is the production implementation and
//! [`MemoryStore`] backs tests. The store owns transport concerns (retries,
//! auth); callers see only the four operations and [`ApiError`].

use crate::api::{ApiError, FeatureToggle};
use crate::reconcile::FeatureDiff;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Fetch a feature by name; `None` when the service has no such feature.
    async fn fetch(&self, name: &str) -> Result<Option<FeatureToggle>, ApiError>;

    /// Create a feature and return the authoritative record.
    async fn create(&self, feature: &FeatureToggle) -> Result<FeatureToggle, ApiError>;

    /// Apply a field diff to an existing feature and return the full record
    /// after the change.
    async fn apply(&self, name: &str, diff: &FeatureDiff) -> Result<FeatureToggle, ApiError>;

    /// Remove a feature. Fails with [`ApiError::NotFound`] when it is already
    /// gone; idempotence is the caller's policy.
    async fn remove(&self, name: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl FeatureStore for crate::api::Client {
    async fn fetch(&self, name: &str) -> Result<Option<FeatureToggle>, ApiError> {
        match self.features().get(name).await {
            Ok(feature) => Ok(Some(feature)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, feature: &FeatureToggle) -> Result<FeatureToggle, ApiError> {
        self.features().create(feature).await
    }

    async fn apply(&self, name: &str, diff: &FeatureDiff) -> Result<FeatureToggle, ApiError> {
        self.features().update(name, diff).await
    }

    async fn remove(&self, name: &str) -> Result<(), ApiError> {
        self.features().delete(name).await
    }
}

/// In-memory store used by resource and integration tests.
///
/// Records every applied diff so tests can assert that updates carry only
/// the changed fields.
#[derive(Default)]
pub struct MemoryStore {
    features: Mutex<HashMap<String, FeatureToggle>>,
    applied: Mutex<Vec<(String, FeatureDiff)>>,
    /// When set, every operation fails with a synthetic remote error.
    fail: Mutex<bool>,
    /// When set, only `apply` fails; fetch keeps working so callers can
    /// re-read authoritative state after the failure.
    fail_apply: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing feature.
    pub fn insert(&self, feature: FeatureToggle) {
        self.features
            .lock()
            .unwrap()
            .insert(feature.name.clone(), feature);
    }

    /// Diffs applied so far, in order.
    pub fn applied_diffs(&self) -> Vec<(String, FeatureDiff)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.features.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.lock().unwrap().is_empty()
    }

    /// Make subsequent operations fail with a remote error.
    pub fn fail_operations(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Make subsequent `apply` calls fail while reads keep working.
    pub fn fail_applies(&self, fail: bool) {
        *self.fail_apply.lock().unwrap() = fail;
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        if *self.fail.lock().unwrap() {
            Err(ApiError::ServiceUnavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn fetch(&self, name: &str) -> Result<Option<FeatureToggle>, ApiError> {
        self.check_failure()?;
        Ok(self.features.lock().unwrap().get(name).cloned())
    }

    async fn create(&self, feature: &FeatureToggle) -> Result<FeatureToggle, ApiError> {
        self.check_failure()?;
        let mut features = self.features.lock().unwrap();
        if features.contains_key(&feature.name) {
            return Err(ApiError::ApiError {
                status: 409,
                message: format!("feature '{}' already exists", feature.name),
            });
        }
        features.insert(feature.name.clone(), feature.clone());
        Ok(feature.clone())
    }

    async fn apply(&self, name: &str, diff: &FeatureDiff) -> Result<FeatureToggle, ApiError> {
        self.check_failure()?;
        if *self.fail_apply.lock().unwrap() {
            return Err(ApiError::ServiceUnavailable);
        }
        let mut features = self.features.lock().unwrap();
        let feature = features
            .get_mut(name)
            .ok_or_else(|| ApiError::NotFound(name.to_string()))?;

        if let Some(description) = &diff.description {
            feature.description = description.clone();
        }
        if let Some(enabled) = diff.enabled {
            feature.enabled = enabled;
        }
        if let Some(tags) = &diff.tags {
            feature.tags = tags.clone();
        }
        if let Some(environments) = &diff.environments {
            feature.environments = environments.clone();
        }

        let updated = feature.clone();
        drop(features);

        self.applied
            .lock()
            .unwrap()
            .push((name.to_string(), diff.clone()));

        Ok(updated)
    }

    async fn remove(&self, name: &str) -> Result<(), ApiError> {
        self.check_failure()?;
        self.features
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(name.to_string()))
    }
}
