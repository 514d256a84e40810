use super::HistoryStore;
use crate::models::GenerationRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// History store backed by a hosted REST collection.
pub struct HttpHistoryStore {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpHistoryStore {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryStore {
    async fn save_generation(&self, record: &GenerationRecord) -> Result<()> {
        let url = format!("{}/records", self.endpoint);
        tracing::debug!("Persisting generation record {} to {}", record.id, url);

        let mut request = self.client.post(&url).json(record);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-Api-Key", api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::History(format!(
                "record write failed (status {}): {}",
                status, body
            )));
        }

        Ok(())
    }
}
