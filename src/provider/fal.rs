use super::GenerationService;
use crate::error::ProviderError;
use crate::keys::ApiKey;
use crate::models::{ParamMap, ProviderOutput};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://fal.run";

/// Client for fal.ai's synchronous run endpoint.
///
/// Each generation is a single POST to `{base_url}/{model_id}` that blocks
/// until the vendor has rendered the images.
pub struct FalClient {
    client: Client,
    base_url: String,
}

impl FalClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

impl Default for FalClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for FalClient {
    async fn generate(
        &self,
        model_id: &str,
        params: &ParamMap,
        key: &ApiKey,
    ) -> std::result::Result<ProviderOutput, ProviderError> {
        let url = format!("{}/{}", self.base_url, model_id);
        tracing::debug!("Submitting generation request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", key.secret))
            .json(params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send generation request: {}", e);
                ProviderError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Generation API error (status {}): {}", status, body);

            // Structured error bodies carry a `detail` field worth surfacing
            // separately from the flattened message.
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| match value.get("detail") {
                    Some(serde_json::Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                    None => None,
                });

            return Err(ProviderError {
                status: Some(status.as_u16()),
                detail,
                message: format!("Generation API error (status {}): {}", status, body),
            });
        }

        let body = response.text().await.map_err(ProviderError::from)?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse generation response: {}\nBody: {}", e, body);
            ProviderError::from_message(format!("Failed to parse generation response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_key() -> ApiKey {
        ApiKey {
            secret: "fal-secret".to_string(),
            index: 0,
        }
    }

    fn params_with_prompt(prompt: &str) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert("prompt".to_string(), json!(prompt));
        params
    }

    #[tokio::test]
    async fn test_generate_posts_params_with_key_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/fal-ai/flux/dev"))
            .and(header("Authorization", "Key fal-secret"))
            .and(body_partial_json(json!({ "prompt": "a red fox" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{ "url": "https://img.example/out.png", "content_type": "image/png" }],
                "seed": 7,
                "request_id": "req-9"
            })))
            .mount(&server)
            .await;

        let client = FalClient::new().with_base_url(server.uri());
        let output = client
            .generate("fal-ai/flux/dev", &params_with_prompt("a red fox"), &test_key())
            .await
            .unwrap();

        assert_eq!(output.images.len(), 1);
        assert_eq!(output.images[0].url, "https://img.example/out.png");
        assert_eq!(output.seed, Some(7));
        assert_eq!(output.request_id.as_deref(), Some("req-9"));
    }

    #[tokio::test]
    async fn test_generate_surfaces_structured_detail() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/fal-ai/flux/dev"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "detail": "Exhausted balance for this billing period"
            })))
            .mount(&server)
            .await;

        let client = FalClient::new().with_base_url(server.uri());
        let err = client
            .generate("fal-ai/flux/dev", &params_with_prompt("a fox"), &test_key())
            .await
            .unwrap_err();

        assert_eq!(err.status, Some(403));
        assert_eq!(
            err.detail.as_deref(),
            Some("Exhausted balance for this billing period")
        );
        assert!(err.message.contains("403"));
    }

    #[tokio::test]
    async fn test_generate_plain_text_error_has_no_detail() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/fal-ai/flux/dev"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let client = FalClient::new().with_base_url(server.uri());
        let err = client
            .generate("fal-ai/flux/dev", &params_with_prompt("a fox"), &test_key())
            .await
            .unwrap_err();

        assert_eq!(err.status, Some(500));
        assert!(err.detail.is_none());
        assert!(err.message.contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_generate_rejects_unparsable_success_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/fal-ai/flux/dev"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = FalClient::new().with_base_url(server.uri());
        let err = client
            .generate("fal-ai/flux/dev", &params_with_prompt("a fox"), &test_key())
            .await
            .unwrap_err();

        assert!(err.message.contains("Failed to parse"));
    }
}
