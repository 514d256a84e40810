use super::GenerationService;
use crate::error::ProviderError;
use crate::keys::ApiKey;
use crate::models::{GeneratedImage, ParamMap, ProviderOutput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Scriptable stand-in for the generation endpoint.
///
/// Failures are keyed by API-key secret so rotation tests can make specific
/// keys look exhausted while others succeed.
#[derive(Clone)]
pub struct MockGenerationClient {
    outputs: Arc<Mutex<Vec<ProviderOutput>>>,
    failures_by_key: Arc<Mutex<HashMap<String, ProviderError>>>,
    seen_keys: Arc<Mutex<Vec<String>>>,
    seen_params: Arc<Mutex<Vec<ParamMap>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            outputs: Arc::new(Mutex::new(Vec::new())),
            failures_by_key: Arc::new(Mutex::new(HashMap::new())),
            seen_keys: Arc::new(Mutex::new(Vec::new())),
            seen_params: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_output(self, output: ProviderOutput) -> Self {
        self.outputs.lock().unwrap().push(output);
        self
    }

    pub fn with_image_urls(self, urls: &[&str]) -> Self {
        let output = ProviderOutput {
            images: urls.iter().map(|url| GeneratedImage::from_url(*url)).collect(),
            seed: Some(1234),
            request_id: Some("mock-request".to_string()),
            ..ProviderOutput::default()
        };
        self.with_output(output)
    }

    pub fn with_failure_for_key(self, secret: impl Into<String>, error: ProviderError) -> Self {
        self.failures_by_key
            .lock()
            .unwrap()
            .insert(secret.into(), error);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Secrets in the order the mock saw them, one per generate call.
    pub fn get_seen_keys(&self) -> Vec<String> {
        self.seen_keys.lock().unwrap().clone()
    }

    /// Parameter bag from the most recent generate call.
    pub fn get_last_params(&self) -> Option<ParamMap> {
        self.seen_params.lock().unwrap().last().cloned()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn generate(
        &self,
        _model_id: &str,
        params: &ParamMap,
        key: &ApiKey,
    ) -> std::result::Result<ProviderOutput, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.seen_keys.lock().unwrap().push(key.secret.clone());
        self.seen_params.lock().unwrap().push(params.clone());

        if let Some(error) = self.failures_by_key.lock().unwrap().get(&key.secret) {
            return Err(error.clone());
        }

        let outputs = self.outputs.lock().unwrap();
        if outputs.is_empty() {
            Ok(ProviderOutput {
                images: vec![GeneratedImage::from_url("https://mock.example/image.png")],
                seed: Some(1234),
                request_id: Some("mock-request".to_string()),
                ..ProviderOutput::default()
            })
        } else {
            let index = (*count - 1) % outputs.len();
            Ok(outputs[index].clone())
        }
    }
}
