//! Outbound generation API integration
//!
//! Provides the interface to the hosted image-generation endpoint. Models are
//! addressed by identifier; parameters are an opaque bag forwarded verbatim.

pub mod fal;
pub mod mock;

pub use fal::FalClient;
pub use mock::MockGenerationClient;

use crate::error::ProviderError;
use crate::keys::ApiKey;
use crate::models::{ParamMap, ProviderOutput};
use async_trait::async_trait;

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        model_id: &str,
        params: &ParamMap,
        key: &ApiKey,
    ) -> std::result::Result<ProviderOutput, ProviderError>;
}
