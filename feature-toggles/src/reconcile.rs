//! Reconciliation of desired configuration against last-known remote state
//!
//! [`reconcile`] computes the single operation needed to converge the remote
//! service on the desired configuration. Update plans carry a [`FeatureDiff`]
//! holding only the changed fields, which is also the PATCH payload sent to
//! the service. These are pure functions; no I/O happens here.

use crate::api::FeatureToggle;
use serde::Serialize;

/// The changed mutable fields between two feature toggle records.
///
/// `None` means unchanged and is omitted from the serialized payload. An
/// empty `description` clears the field remotely (absent and empty are the
/// same thing in this data model).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<String>>,
}

impl FeatureDiff {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.enabled.is_none()
            && self.tags.is_none()
            && self.environments.is_none()
    }
}

/// The operation required to converge remote state on the desired
/// configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Remote already matches desired
    NoOp,
    /// No remote entity exists for the desired configuration
    Create,
    /// Remote exists and mutable fields differ
    Update(FeatureDiff),
    /// The identifier changed; the host must delete then recreate
    Replace,
    /// Desired configuration is gone but remote state remains
    Delete,
}

/// Decide what has to happen given desired configuration and last-known
/// remote state. Identifier changes are never expressed as updates.
pub fn reconcile(desired: Option<&FeatureToggle>, remote: Option<&FeatureToggle>) -> Plan {
    match (desired, remote) {
        (None, None) => Plan::NoOp,
        (Some(_), None) => Plan::Create,
        (None, Some(_)) => Plan::Delete,
        (Some(desired), Some(remote)) => {
            if desired.name != remote.name {
                return Plan::Replace;
            }
            let diff = diff(remote, desired);
            if diff.is_empty() {
                Plan::NoOp
            } else {
                Plan::Update(diff)
            }
        }
    }
}

/// Compute the minimal field diff taking remote state to the desired record.
///
/// Tag order is irrelevant for equality, so a pure reordering produces no
/// diff; when tags do differ the desired ordering is sent so it round-trips.
/// Environment order is significant.
pub fn diff(remote: &FeatureToggle, desired: &FeatureToggle) -> FeatureDiff {
    let mut diff = FeatureDiff::default();

    if remote.description != desired.description {
        diff.description = Some(desired.description.clone());
    }
    if remote.enabled != desired.enabled {
        diff.enabled = Some(desired.enabled);
    }
    if !tags_equal(&remote.tags, &desired.tags) {
        diff.tags = Some(desired.tags.clone());
    }
    if remote.environments != desired.environments {
        diff.environments = Some(desired.environments.clone());
    }

    diff
}

fn tags_equal(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted = a.to_vec();
    let mut b_sorted = b.to_vec();
    a_sorted.sort();
    b_sorted.sort();
    a_sorted == b_sorted
}
