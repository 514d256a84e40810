//! Per-model default parameters and request normalization
//!
//! Model defaults live in a lookup table keyed by model identifier rather
//! than branching code, so adding a model is a data change. Defaults only
//! fill in keys the caller left unset; caller values always win.

use crate::models::ParamMap;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Upper bound on images per request, applied before dispatch.
pub const MAX_IMAGES_PER_REQUEST: u64 = 4;

fn object(value: Value) -> ParamMap {
    match value {
        Value::Object(map) => map,
        _ => ParamMap::new(),
    }
}

static MODEL_DEFAULTS: Lazy<HashMap<&'static str, ParamMap>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        "fal-ai/flux/dev",
        object(json!({
            "image_size": "landscape_4_3",
            "num_inference_steps": 28,
            "guidance_scale": 3.5,
            "enable_safety_checker": true
        })),
    );
    table.insert(
        "fal-ai/flux/schnell",
        object(json!({
            "image_size": "square_hd",
            "num_inference_steps": 4,
            "enable_safety_checker": true
        })),
    );
    table.insert(
        "fal-ai/flux-pro/v1.1",
        object(json!({
            "image_size": "landscape_4_3",
            "safety_tolerance": "2"
        })),
    );
    table.insert(
        "fal-ai/fast-sdxl",
        object(json!({
            "num_inference_steps": 25,
            "guidance_scale": 7.5,
            "expand_prompt": true
        })),
    );
    table.insert(
        "fal-ai/recraft-v3",
        object(json!({
            "image_size": "square_hd",
            "style": "realistic_image"
        })),
    );
    table.insert(
        "fal-ai/stable-diffusion-v35-large",
        object(json!({
            "num_inference_steps": 28,
            "guidance_scale": 3.5
        })),
    );
    table
});

/// Default parameter overrides for a model, if any are registered.
pub fn model_defaults(model_id: &str) -> Option<&'static ParamMap> {
    MODEL_DEFAULTS.get(model_id)
}

/// Fill in registered defaults for keys the caller did not set.
pub fn apply_model_defaults(model_id: &str, params: &mut ParamMap) {
    if let Some(defaults) = model_defaults(model_id) {
        for (key, value) in defaults {
            if !params.contains_key(key) {
                params.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Clamp `num_images` to [`MAX_IMAGES_PER_REQUEST`]. Absent or in-range
/// values are left untouched.
pub fn clamp_num_images(params: &mut ParamMap) {
    if let Some(requested) = params.get("num_images").and_then(Value::as_u64) {
        if requested > MAX_IMAGES_PER_REQUEST {
            tracing::warn!(
                "num_images {} exceeds limit, clamping to {}",
                requested,
                MAX_IMAGES_PER_REQUEST
            );
            params.insert("num_images".to_string(), json!(MAX_IMAGES_PER_REQUEST));
        }
    }
}
