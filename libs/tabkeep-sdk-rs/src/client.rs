//! TabKeep API client implementation.

use serde::Serialize;
use url::Url;

use crate::error::TabkeepError;

/// Configuration for the TabKeep client.
#[derive(Debug, Clone)]
pub struct TabkeepConfig {
    /// Origin serving the API (e.g., "https://tabkeep.app")
    pub base_url: String,
}

/// Body of `POST /api/authorize-device`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeDeviceRequest {
    pub email: String,
    pub device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// TabKeep client used by the extension-side code paths.
pub struct TabkeepClient {
    base_url: Url,
    #[cfg(feature = "client")]
    http_client: reqwest::Client,
}

impl TabkeepClient {
    /// Create a new client.
    ///
    /// # Returns
    /// A configured `TabkeepClient` or an error if the base URL is unusable.
    pub fn new(config: TabkeepConfig) -> Result<Self, TabkeepError> {
        if config.base_url.trim().is_empty() {
            return Err(TabkeepError::Config("base_url is required".into()));
        }

        let mut base_url = Url::parse(config.base_url.trim())
            .map_err(|e| TabkeepError::Config(format!("invalid base_url: {}", e)))?;

        if base_url.cannot_be_a_base() {
            return Err(TabkeepError::Config("base_url must be an http(s) origin".into()));
        }

        // Url::join replaces the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            #[cfg(feature = "client")]
            http_client: reqwest::Client::new(),
        })
    }

    /// Resolve an API path (without leading slash) against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, TabkeepError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TabkeepError::Config(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Read the entitlement status for a user (email).
    ///
    /// The server always answers `200`; a degraded body is returned as-is.
    #[cfg(feature = "client")]
    pub async fn status(&self, user: &str) -> Result<tabkeep_types::StatusResponse, TabkeepError> {
        let mut url = self.endpoint("api/status")?;
        url.query_pairs_mut().append_pair("user", user);

        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }

    /// Authorize this device for the account.
    ///
    /// A quota refusal is surfaced as [`TabkeepError::DeviceLimitReached`].
    #[cfg(feature = "client")]
    pub async fn authorize_device(
        &self,
        request: &AuthorizeDeviceRequest,
    ) -> Result<tabkeep_types::AuthorizeDeviceResponse, TabkeepError> {
        let url = self.endpoint("api/authorize-device")?;
        let response = self.http_client.post(url).json(request).send().await?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            let body: tabkeep_types::DeviceLimitResponse = response.json().await?;
            return Err(TabkeepError::DeviceLimitReached {
                device_count: body.device_count,
                max_devices: body.max_devices,
                plan_type: body.plan_type,
            });
        }

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }

    /// Remove a device from the account.
    #[cfg(feature = "client")]
    pub async fn remove_device(
        &self,
        email: &str,
        device_id: &str,
    ) -> Result<tabkeep_types::RemoveDeviceResponse, TabkeepError> {
        let url = self.endpoint("api/remove-device")?;
        let response = self
            .http_client
            .post(url)
            .json(&serde_json::json!({ "email": email, "device_id": device_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }
}

#[cfg(feature = "client")]
async fn error_from_response(response: reqwest::Response) -> TabkeepError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<tabkeep_types::ErrorBody>(&text) {
        Ok(body) => TabkeepError::ApiError {
            code: body.code,
            message: body.error,
        },
        Err(_) => TabkeepError::UnexpectedResponse(format!("HTTP {}: {}", status, text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> Result<TabkeepClient, TabkeepError> {
        TabkeepClient::new(TabkeepConfig {
            base_url: base_url.to_string(),
        })
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        assert!(matches!(client("  "), Err(TabkeepError::Config(_))));
    }

    #[test]
    fn test_config_validation_unparseable_base_url() {
        assert!(matches!(client("not a url"), Err(TabkeepError::Config(_))));
    }

    #[test]
    fn test_endpoint_joins_against_origin() {
        let client = client("https://tabkeep.app").unwrap();
        let url = client.endpoint("api/status").unwrap();
        assert_eq!(url.as_str(), "https://tabkeep.app/api/status");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let client = client("https://example.com/tabkeep").unwrap();
        let url = client.endpoint("/api/authorize-device").unwrap();
        assert_eq!(url.as_str(), "https://example.com/tabkeep/api/authorize-device");
    }

    #[test]
    fn test_authorize_request_skips_absent_fields() {
        let request = AuthorizeDeviceRequest {
            email: "a@example.com".into(),
            device_id: "dev-1".into(),
            device_name: None,
            device_fingerprint: None,
            metadata: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["device_id"], "dev-1");
        assert!(json.get("device_name").is_none());
        assert!(json.get("metadata").is_none());
    }
}
