//! Provider data structure passed to resources

use crate::store::FeatureStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct FeatureTogglesProviderData {
    pub store: Arc<dyn FeatureStore>,
}

impl FeatureTogglesProviderData {
    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self { store }
    }
}
