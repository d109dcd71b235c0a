use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use super::error::ApiError;

/// Feature-flag service API client
///
/// Cheap to clone; all clones share one connection pool. Retry/backoff policy
/// lives here, not in the resource lifecycle: only rate limiting, server
/// errors and transport failures are retried.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

/// Error body returned by the feature-flag service
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, api_token: &str, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(endpoint, api_token, insecure, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        api_token: &str,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(endpoint)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ApiError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(std::time::Duration::from_secs(retry_config.timeout_seconds))
            .build()?;

        let base_url = endpoint.trim_end_matches('/').to_string();
        let auth_header = format!("Bearer {}", api_token);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth_header,
                retry_config,
            }),
        })
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .execute_with_retry(
                || async {
                    let url = format!("{}{}", self.inner.base_url, path);

                    tracing::debug!("GET request to: {}", url);

                    self.inner
                        .http_client
                        .get(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .send()
                        .await
                },
                path,
            )
            .await?;

        self.parse_body(response).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute_with_retry(
                || async {
                    let url = format!("{}{}", self.inner.base_url, path);

                    tracing::debug!("POST request to: {}", url);

                    self.inner
                        .http_client
                        .post(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .json(body)
                        .send()
                        .await
                },
                path,
            )
            .await?;

        self.parse_body(response).await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute_with_retry(
                || async {
                    let url = format!("{}{}", self.inner.base_url, path);

                    tracing::debug!("PATCH request to: {}", url);

                    self.inner
                        .http_client
                        .patch(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .json(body)
                        .send()
                        .await
                },
                path,
            )
            .await?;

        self.parse_body(response).await
    }

    /// Execute a DELETE request with retry logic. The service returns an
    /// empty body on success.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("DELETE request to: {}", url);

                self.inner
                    .http_client
                    .delete(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
                    .await
            },
            path,
        )
        .await
        .map(|_| ())
    }

    /// Feature API operations
    pub fn features(&self) -> super::features::FeaturesApi<'_> {
        super::features::FeaturesApi::new(self)
    }

    /// Execute a request with retry logic, returning the successful response.
    /// Client errors (4xx) are mapped and returned without retrying.
    async fn execute_with_retry<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::AuthError);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(self.read_error_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn parse_body<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn read_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => text,
        };

        ApiError::ApiError { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::Value;

    fn test_client(endpoint: &str) -> Client {
        Client::with_config(
            endpoint,
            "test-token",
            true,
            RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 10,
                timeout_seconds: 5,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn client_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/features/dark-mode")
            .match_header("authorization", "Bearer test-token")
            .with_body(r#"{"name":"dark-mode"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let body: Value = client.get("/v1/features/dark-mode").await.unwrap();
        assert_eq!(body["name"], "dark-mode");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_rejects_invalid_endpoint() {
        let result = Client::new("not a url", "token", false);
        assert!(matches!(result, Err(ApiError::InvalidEndpoint(_))));

        let result = Client::new("ftp://example.com", "token", false);
        assert!(matches!(result, Err(ApiError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn client_strips_trailing_slash_from_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/features")
            .with_body("[]")
            .create_async()
            .await;

        let client = test_client(&format!("{}/", server.url()));
        let _: Value = client.get("/v1/features").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_maps_unauthorized_without_retrying() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/features")
            .with_status(401)
            .with_body(r#"{"error":"bad token"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<Value, _> = client.get("/v1/features").await;
        assert!(matches!(result, Err(ApiError::AuthError)));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_does_not_retry_client_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/features/missing")
            .with_status(404)
            .with_body(r#"{"error":"feature not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<Value, _> = client.get("/v1/features/missing").await;
        match result {
            Err(ApiError::ApiError { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "feature not found");
            }
            other => panic!("expected ApiError, got {:?}", other.err()),
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_retries_server_errors_until_success() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/v1/features")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("GET", "/v1/features")
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<Value, _> = client.get("/v1/features").await;
        assert!(result.is_ok());

        failing.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn client_gives_up_after_max_retries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/features")
            .with_status(503)
            .expect(3) // initial attempt + 2 retries
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<Value, _> = client.get("/v1/features").await;
        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_reports_parse_failures() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/features")
            .with_body("not json")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result: Result<Value, _> = client.get("/v1/features").await;
        assert!(matches!(result, Err(ApiError::ParseError(_))));
    }
}
