//! Recognition: send a bounded image plus the extraction instruction to a
//! vision model and turn the reply into a JSON value.
//!
//! The model is reached through the [`RecognitionCapability`] trait. The
//! production implementation, [`LlmRecognizer`], wraps an
//! `edgequake_llm` provider; tests substitute scripted doubles. The handle
//! is built once per run and passed down explicitly.
//!
//! ## Failure policy
//!
//! There is exactly one call per file, with no retry and no timeout beyond
//! what the transport does on its own. A failed call is *not* an error for
//! the batch: [`extract_fields`] returns the record
//! `{"error": "API call failed", "details": <message>}` instead, so the CSV
//! still shows that the file was attempted.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, RecognitionError};
use crate::pipeline::encode::encode_image;
use crate::pipeline::normalize::BoundedImage;
use crate::pipeline::recover::recover;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Environment variable holding the recognition service credential.
pub const CREDENTIAL_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// `error` value of a record whose recognition call failed.
pub const API_FAILURE_ERROR: &str = "API call failed";

/// One element of a structured reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
        }
    }
}

/// Reply envelope of a recognition call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionReply {
    /// The service answered with plain text.
    Text(String),
    /// The service answered with a list of content blocks.
    Blocks(Vec<ContentBlock>),
}

impl RecognitionReply {
    /// The textual payload: the text itself, or the first block's text.
    pub fn into_text(self) -> Result<String, RecognitionError> {
        match self {
            RecognitionReply::Text(text) => Ok(text),
            RecognitionReply::Blocks(blocks) => blocks
                .into_iter()
                .next()
                .and_then(|block| block.text)
                .ok_or(RecognitionError::EmptyReply),
        }
    }
}

/// An external multimodal service that reads an image and answers in text.
#[async_trait]
pub trait RecognitionCapability: Send + Sync {
    /// Send one request carrying `image` and `instruction`.
    async fn recognize(
        &self,
        image: ImageData,
        instruction: &str,
    ) -> Result<RecognitionReply, RecognitionError>;
}

/// [`RecognitionCapability`] backed by an `edgequake_llm` provider.
pub struct LlmRecognizer {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmRecognizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Check the credential and build the configured provider.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl RecognitionCapability for LlmRecognizer {
    async fn recognize(
        &self,
        image: ImageData,
        instruction: &str,
    ) -> Result<RecognitionReply, RecognitionError> {
        let messages = vec![ChatMessage::user_with_images(instruction, vec![image])];

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| RecognitionError::Transport(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(RecognitionReply::Text(response.content))
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Fail fast when the credential is missing, then ask the factory for the
/// configured provider and model.
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    match std::env::var(CREDENTIAL_ENV_VAR) {
        Ok(key) if !key.trim().is_empty() => {}
        _ => {
            return Err(ExtractError::MissingCredential {
                var: CREDENTIAL_ENV_VAR,
            })
        }
    }

    ProviderFactory::create_llm_provider(&config.provider_name, &config.model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: config.provider_name.clone(),
            hint: format!("{e}"),
        }
    })
}

/// The record for a failed recognition call.
pub fn api_failure(details: &str) -> Value {
    json!({
        "error": API_FAILURE_ERROR,
        "details": details,
    })
}

/// Encode `image`, make exactly one recognition call and recover the
/// reply's JSON.
///
/// Only an encoding failure is returned as `Err`; every failure of the call
/// itself becomes an [`api_failure`] record.
pub async fn extract_fields(
    capability: &dyn RecognitionCapability,
    image: &BoundedImage,
    instruction: &str,
) -> Result<Value, ExtractError> {
    let image_data = encode_image(image)?;

    let text = match capability.recognize(image_data, instruction).await {
        Ok(reply) => reply.into_text(),
        Err(e) => Err(e),
    };

    match text {
        Ok(text) => {
            debug!("Recognition reply: {} chars", text.len());
            Ok(recover(&text))
        }
        Err(e) => {
            warn!("Error calling recognition service: {}", e);
            Ok(api_failure(&e.to_string()))
        }
    }
}
