//! Generation history persistence
//!
//! Stores one record per generated image in a hosted collection. Writes are
//! best-effort from the dispatcher's point of view: a failed write is logged
//! and never fails the generation that produced it.

pub mod client;
pub mod mock;

pub use client::HttpHistoryStore;
pub use mock::MockHistoryStore;

use crate::models::GenerationRecord;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save_generation(&self, record: &GenerationRecord) -> Result<()>;
}
