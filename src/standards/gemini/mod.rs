//! Gemini Endpoint Tracers
//!
//! Traces `models/{model}:generateContent` and
//! `models/{model}:streamGenerateContent` on both the Gemini API and Vertex AI
//! path layouts. Unlike OpenAI and Anthropic, streaming is selected by the
//! path and the model name is part of the path rather than the body.

use super::{EndpointTracer, NoopTracer};

pub mod generate_content;
pub mod streaming;

pub use generate_content::GenerateContentTracer;

/// Provider name recorded in span metadata.
pub const PROVIDER: &str = "gemini";

const UNTRACED_METHODS: &[&str] = &["countTokens", "embedContent", "batchEmbedContents"];

/// Split `.../models/{model}:{method}` into its model and method.
fn model_method(path: &str) -> Option<(&str, &str)> {
    let (_, rest) = path.rsplit_once("models/")?;
    let (model, method) = rest.split_once(':')?;
    if model.is_empty() || model.contains('/') {
        return None;
    }
    Some((model, method.trim_end_matches('/')))
}

/// Map a Gemini request path to its tracer.
pub fn router(path: &str) -> Option<Box<dyn EndpointTracer>> {
    let (model, method) = model_method(path)?;
    match method {
        "generateContent" => Some(Box::new(GenerateContentTracer::new(model, false))),
        "streamGenerateContent" => Some(Box::new(GenerateContentTracer::new(model, true))),
        m if UNTRACED_METHODS.contains(&m) => Some(Box::new(NoopTracer)),
        _ => None,
    }
}
