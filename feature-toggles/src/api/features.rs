//! Feature toggle API implementation
//!
//! REST surface of the feature-flag service:
//! `GET/POST /v1/features` and `GET/PATCH/DELETE /v1/features/{name}`.

use super::error::ApiError;
use crate::reconcile::FeatureDiff;
use serde::{Deserialize, Serialize};

/// A feature toggle as known to the remote service.
///
/// `name` is the unique identifier and is immutable after creation; all other
/// fields are mutable. `description` and `tags` default to empty when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureToggle {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub environments: Vec<String>,
}

fn feature_path(name: &str) -> String {
    format!("/v1/features/{}", name)
}

/// Maps a 404 from the service onto [`ApiError::NotFound`] carrying the
/// feature name.
fn map_not_found(err: ApiError, name: &str) -> ApiError {
    match err {
        ApiError::ApiError { status: 404, .. } => ApiError::NotFound(name.to_string()),
        other => other,
    }
}

/// Features API for feature toggle operations
pub struct FeaturesApi<'a> {
    client: &'a super::Client,
}

impl<'a> FeaturesApi<'a> {
    pub fn new(client: &'a super::Client) -> Self {
        Self { client }
    }

    /// GET /v1/features
    pub async fn list(&self) -> Result<Vec<FeatureToggle>, ApiError> {
        self.client.get("/v1/features").await
    }

    /// GET /v1/features/{name}
    pub async fn get(&self, name: &str) -> Result<FeatureToggle, ApiError> {
        self.client
            .get(&feature_path(name))
            .await
            .map_err(|e| map_not_found(e, name))
    }

    /// POST /v1/features
    ///
    /// The service echoes back the created record, which is authoritative.
    pub async fn create(&self, feature: &FeatureToggle) -> Result<FeatureToggle, ApiError> {
        self.client.post("/v1/features", feature).await
    }

    /// PATCH /v1/features/{name}
    ///
    /// The body contains only the changed fields; the service returns the
    /// full record after applying them.
    pub async fn update(
        &self,
        name: &str,
        diff: &FeatureDiff,
    ) -> Result<FeatureToggle, ApiError> {
        self.client
            .patch(&feature_path(name), diff)
            .await
            .map_err(|e| map_not_found(e, name))
    }

    /// DELETE /v1/features/{name}
    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.client
            .delete(&feature_path(name))
            .await
            .map_err(|e| map_not_found(e, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use mockito::Server;

    fn sample_feature() -> FeatureToggle {
        FeatureToggle {
            name: "dark-mode".to_string(),
            description: "Dark mode rollout".to_string(),
            enabled: true,
            tags: vec!["ui".to_string()],
            environments: vec!["dev".to_string(), "prod".to_string()],
        }
    }

    #[tokio::test]
    async fn get_returns_feature() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/features/dark-mode")
            .with_body(
                r#"{"name":"dark-mode","description":"Dark mode rollout","enabled":true,"tags":["ui"],"environments":["dev","prod"]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token", true).unwrap();
        let feature = client.features().get("dark-mode").await.unwrap();
        assert_eq!(feature, sample_feature());
    }

    #[tokio::test]
    async fn get_fills_defaults_for_absent_optional_fields() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/features/minimal")
            .with_body(r#"{"name":"minimal","enabled":false,"environments":["dev"]}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token", true).unwrap();
        let feature = client.features().get("minimal").await.unwrap();
        assert_eq!(feature.description, "");
        assert!(feature.tags.is_empty());
    }

    #[tokio::test]
    async fn get_maps_missing_feature_to_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/features/ghost")
            .with_status(404)
            .with_body(r#"{"error":"feature not found"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token", true).unwrap();
        let result = client.features().get("ghost").await;
        match result {
            Err(ApiError::NotFound(name)) => assert_eq!(name, "ghost"),
            other => panic!("expected NotFound, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn create_posts_record_and_returns_authoritative_copy() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/features")
            .match_body(mockito::Matcher::JsonString(
                r#"{"name":"dark-mode","description":"Dark mode rollout","enabled":true,"tags":["ui"],"environments":["dev","prod"]}"#.to_string(),
            ))
            .with_status(201)
            .with_body(
                r#"{"name":"dark-mode","description":"Dark mode rollout","enabled":true,"tags":["ui"],"environments":["dev","prod"]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token", true).unwrap();
        let created = client.features().create(&sample_feature()).await.unwrap();
        assert_eq!(created.name, "dark-mode");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_sends_only_changed_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/v1/features/dark-mode")
            .match_body(mockito::Matcher::JsonString(
                r#"{"enabled":false}"#.to_string(),
            ))
            .with_body(
                r#"{"name":"dark-mode","description":"Dark mode rollout","enabled":false,"tags":["ui"],"environments":["dev","prod"]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token", true).unwrap();
        let diff = FeatureDiff {
            enabled: Some(false),
            ..FeatureDiff::default()
        };
        let updated = client.features().update("dark-mode", &diff).await.unwrap();
        assert!(!updated.enabled);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_succeeds_on_empty_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v1/features/dark-mode")
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token", true).unwrap();
        client.features().delete("dark-mode").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_maps_missing_feature_to_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/v1/features/ghost")
            .with_status(404)
            .with_body(r#"{"error":"feature not found"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "token", true).unwrap();
        let result = client.features().delete("ghost").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
