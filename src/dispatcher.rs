//! Generation request dispatch with balance-driven key rotation
//!
//! The dispatcher validates the request, normalizes the parameter bag, calls
//! the provider with the active key, and folds every outcome into a single
//! [`GenerationOutcome`]. When the vendor reports an exhausted balance it
//! advances the key ring and tries again with the next key; the loop visits
//! each ring position at most once, so it is bounded by the list length.

use crate::defaults::{apply_model_defaults, clamp_num_images};
use crate::error::ProviderError;
use crate::history::HistoryStore;
use crate::keys::KeyRing;
use crate::models::{GenerationOutcome, GenerationRecord, ParamMap, ProviderOutput};
use crate::provider::GenerationService;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Vendor fragment that identifies an exhausted-balance failure.
const BALANCE_FRAGMENT: &str = "Exhausted balance";

type BalanceSignal = fn(&ProviderError) -> bool;

/// Independent exhausted-balance detectors, checked in order with
/// short-circuit on the first match.
const BALANCE_SIGNALS: &[BalanceSignal] = &[
    detail_reports_exhausted_balance,
    message_reports_forbidden_balance,
    embedded_json_reports_exhausted_balance,
];

/// Structured error body whose `detail` field names the fragment.
fn detail_reports_exhausted_balance(error: &ProviderError) -> bool {
    error
        .detail
        .as_deref()
        .is_some_and(|detail| detail.contains(BALANCE_FRAGMENT))
}

/// Flattened message carrying both a 403 marker and the fragment.
fn message_reports_forbidden_balance(error: &ProviderError) -> bool {
    error.message.contains("403") && error.message.contains(BALANCE_FRAGMENT)
}

/// Best-effort scan of the message for an embedded JSON object whose
/// `detail` field names the fragment. Takes the outermost `{...}` span and
/// gives up silently if it does not parse.
fn embedded_json_reports_exhausted_balance(error: &ProviderError) -> bool {
    let start = match error.message.find('{') {
        Some(start) => start,
        None => return false,
    };
    let end = match error.message.rfind('}') {
        Some(end) if end > start => end,
        _ => return false,
    };

    serde_json::from_str::<Value>(&error.message[start..=end])
        .ok()
        .and_then(|body| body.get("detail").and_then(Value::as_str).map(String::from))
        .is_some_and(|detail| detail.contains(BALANCE_FRAGMENT))
}

fn is_balance_exhausted(error: &ProviderError) -> bool {
    BALANCE_SIGNALS.iter().any(|signal| signal(error))
}

/// Dispatches generation requests and owns the retry-on-exhaustion loop.
///
/// All collaborators are injected, so tests run against mocks with no
/// ambient state. The key ring handle is shared: rotation performed here is
/// visible to every other holder of the same ring.
pub struct Dispatcher {
    provider: Arc<dyn GenerationService>,
    history: Arc<dyn HistoryStore>,
    keys: KeyRing,
    user_id: Option<String>,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn GenerationService>,
        history: Arc<dyn HistoryStore>,
        keys: KeyRing,
    ) -> Self {
        Self {
            provider,
            history,
            keys,
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Run one generation request to completion.
    ///
    /// Never returns an `Err`: every failure class is folded into
    /// [`GenerationOutcome::Failure`] so callers only ever branch on the
    /// outcome itself.
    pub async fn dispatch(&self, model_id: &str, mut params: ParamMap) -> GenerationOutcome {
        let prompt = match params.get("prompt").and_then(Value::as_str) {
            Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
            _ => {
                return GenerationOutcome::failure("prompt must be a non-empty string");
            }
        };

        let mut key = match self.keys.get_active() {
            Some(key) if !key.secret.is_empty() => key,
            Some(_) => {
                return GenerationOutcome::failure("active API key is empty");
            }
            None => {
                return GenerationOutcome::failure("no API key configured");
            }
        };

        apply_model_defaults(model_id, &mut params);
        clamp_num_images(&mut params);

        loop {
            info!("Dispatching {} with key #{}", model_id, key.index);

            match self.provider.generate(model_id, &params, &key).await {
                Ok(output) if output.images.is_empty() => {
                    warn!("Generation for {} returned no images", model_id);
                    return GenerationOutcome::failure("no images produced");
                }
                Ok(output) => {
                    info!(
                        "Generation for {} produced {} image(s)",
                        model_id,
                        output.images.len()
                    );
                    self.persist_images(model_id, &prompt, &params, &output)
                        .await;
                    return GenerationOutcome::Success(output);
                }
                Err(error) if is_balance_exhausted(&error) => {
                    warn!("Key #{} reported exhausted balance", key.index);
                    match self.keys.advance() {
                        Some(next) => {
                            info!("Rotated to key #{}", next.index);
                            key = next;
                        }
                        None => {
                            warn!("All keys exhausted for {}", model_id);
                            return GenerationOutcome::all_keys_exhausted(error.message);
                        }
                    }
                }
                Err(error) => {
                    warn!("Generation for {} failed: {}", model_id, error.message);
                    return GenerationOutcome::failure(error.message);
                }
            }
        }
    }

    /// Write one history record per image, all in parallel. Write failures
    /// are logged and dropped; they never affect the dispatch outcome.
    async fn persist_images(
        &self,
        model_id: &str,
        prompt: &str,
        params: &ParamMap,
        output: &ProviderOutput,
    ) {
        let writes = output.images.iter().map(|image| {
            let record = GenerationRecord {
                id: Uuid::new_v4(),
                model_id: model_id.to_string(),
                prompt: prompt.to_string(),
                parameters: params.clone(),
                image: image.clone(),
                created_at: Utc::now(),
                user_id: self.user_id.clone(),
            };
            async move {
                if let Err(e) = self.history.save_generation(&record).await {
                    warn!("Failed to persist generation record {}: {}", record.id, e);
                }
            }
        });

        futures::future::join_all(writes).await;
    }
}
