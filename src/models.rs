//! Data models and structures
//!
//! Defines the core data structures for generation requests, outcomes,
//! history records, and environment configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameter bag sent alongside a model identifier. Keys and value shapes are
/// model-specific; `prompt` is the only key the dispatcher itself requires.
pub type ParamMap = serde_json::Map<String, serde_json::Value>;

/// One generated image: a URL plus whatever metadata the vendor included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl GeneratedImage {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            content_type: None,
        }
    }
}

/// Successful generation payload, mirroring the vendor's response shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderOutput {
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_nsfw_concepts: Option<Vec<bool>>,
}

/// Machine-readable failure codes surfaced to the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AllKeysExhausted,
}

/// The single discriminated result every dispatch produces. No error escapes
/// `dispatch` as `Err`; everything is folded into `Failure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GenerationOutcome {
    Success(ProviderOutput),
    Failure {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}

impl GenerationOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            error_code: None,
        }
    }

    pub fn all_keys_exhausted(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            error_code: Some(ErrorCode::AllKeysExhausted),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One history record per generated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub model_id: String,
    pub prompt: String,
    pub parameters: ParamMap,
    pub image: GeneratedImage,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub history_endpoint: Option<String>,
    pub history_api_key: Option<String>,
    pub user_id: Option<String>,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let api_keys: Vec<String> = std::env::var("FAL_API_KEYS")
            .map_err(|_| crate::Error::Generic("FAL_API_KEYS not set".to_string()))?
            .split(',')
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();

        if api_keys.is_empty() {
            return Err(crate::Error::Generic(
                "FAL_API_KEYS contains no usable keys".to_string(),
            ));
        }

        Ok(Self {
            api_keys,
            base_url: std::env::var("FAL_BASE_URL")
                .unwrap_or_else(|_| "https://fal.run".to_string()),
            history_endpoint: std::env::var("HISTORY_ENDPOINT").ok(),
            history_api_key: std::env::var("HISTORY_API_KEY").ok(),
            user_id: std::env::var("VISIONGEN_USER_ID").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::AllKeysExhausted).unwrap();
        assert_eq!(json, "\"ALL_KEYS_EXHAUSTED\"");
    }

    #[test]
    fn test_outcome_serialization_tags_status() {
        let outcome = GenerationOutcome::all_keys_exhausted("every key is out of balance");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"failure\""));
        assert!(json.contains("\"error_code\":\"ALL_KEYS_EXHAUSTED\""));

        let plain = GenerationOutcome::failure("boom");
        let json = serde_json::to_string(&plain).unwrap();
        assert!(!json.contains("error_code"));
    }

    #[test]
    fn test_provider_output_deserializes_vendor_shape() {
        let body = serde_json::json!({
            "images": [
                { "url": "https://img.example/1.png", "width": 1024, "height": 768, "content_type": "image/png" }
            ],
            "seed": 42,
            "request_id": "req-1",
            "timings": { "inference": 1.2 },
            "has_nsfw_concepts": [false]
        });

        let output: ProviderOutput = serde_json::from_value(body).unwrap();
        assert_eq!(output.images.len(), 1);
        assert_eq!(output.images[0].width, Some(1024));
        assert_eq!(output.seed, Some(42));
        assert_eq!(output.has_nsfw_concepts, Some(vec![false]));
    }

    #[test]
    fn test_provider_output_tolerates_missing_fields() {
        let output: ProviderOutput = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(output.images.is_empty());
        assert!(output.seed.is_none());
    }

    #[test]
    fn test_generation_record_roundtrip() {
        let record = GenerationRecord {
            id: Uuid::new_v4(),
            model_id: "fal-ai/flux/dev".to_string(),
            prompt: "a fox in the snow".to_string(),
            parameters: ParamMap::new(),
            image: GeneratedImage::from_url("https://img.example/fox.png"),
            created_at: Utc::now(),
            user_id: Some("user-1".to_string()),
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: GenerationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model_id, record.model_id);
        assert_eq!(back.image.url, "https://img.example/fox.png");
    }
}
