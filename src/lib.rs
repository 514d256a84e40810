//! Dispatch core for visiongen - invokes hosted image-generation models
//!
//! Takes a model identifier and a parameter bag, submits them to a fal.ai-style
//! generation endpoint with the currently active API key, rotates to the next
//! key when the vendor reports an exhausted balance, and persists one history
//! record per generated image.

pub mod defaults;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod keys;
pub mod models;
pub mod provider;

pub use error::{Error, Result};
