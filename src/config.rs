//! Configuration types for identity-document extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The defaults are the fixed constants
//! the `id2csv` binary runs with; the CLI deliberately exposes none of them.
//! Library callers and tests may tighten the bounds.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default provider used for recognition.
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Pixel and byte bounds applied by [`crate::pipeline::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    /// Maximum width and height in pixels. Default: 2000.
    pub max_dimension: u32,

    /// Maximum encoded JPEG size in bytes. Default: 5 MiB.
    pub max_bytes: usize,

    /// First JPEG quality tried. Default: 85.
    pub initial_quality: u8,

    /// Quality decrement between attempts. Default: 5.
    pub quality_step: u8,

    /// Exclusive quality floor; the search stops once quality drops to
    /// this value or below. Default: 5.
    pub min_quality: u8,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            max_bytes: 5 * 1024 * 1024,
            initial_quality: 85,
            quality_step: 5,
            min_quality: 5,
        }
    }
}

/// Configuration for an extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_id2csv::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .max_dimension(1600)
///     .max_bytes(2 * 1024 * 1024)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Size and byte bounds for the transmitted image.
    pub limits: ImageLimits,

    /// LLM provider name passed to `ProviderFactory`. Default: "anthropic".
    pub provider_name: String,

    /// Vision model identifier. Default: "claude-3-haiku-20240307".
    pub model: String,

    /// Maximum tokens the model may generate per file. Default: 1000.
    pub max_tokens: usize,

    /// Sampling temperature. Default: None (provider default).
    pub temperature: Option<f32>,

    /// Custom extraction instruction. If None, uses the built-in prompt.
    pub instruction: Option<String>,

    /// Per-file progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            limits: ImageLimits::default(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: None,
            instruction: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("limits", &self.limits)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("instruction", &self.instruction.as_ref().map(|_| "<custom>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.limits.max_dimension = px;
        self
    }

    pub fn max_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_bytes = bytes;
        self
    }

    pub fn initial_quality(mut self, q: u8) -> Self {
        self.config.limits.initial_quality = q;
        self
    }

    pub fn quality_step(mut self, step: u8) -> Self {
        self.config.limits.quality_step = step;
        self
    }

    pub fn min_quality(mut self, q: u8) -> Self {
        self.config.limits.min_quality = q;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn instruction(mut self, prompt: impl Into<String>) -> Self {
        self.config.instruction = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let l = &self.config.limits;
        if l.max_dimension == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_dimension must be ≥ 1".into(),
            ));
        }
        if l.max_bytes == 0 {
            return Err(ExtractError::InvalidConfig("max_bytes must be ≥ 1".into()));
        }
        if l.initial_quality == 0 || l.initial_quality > 100 {
            return Err(ExtractError::InvalidConfig(format!(
                "initial_quality must be 1–100, got {}",
                l.initial_quality
            )));
        }
        if l.quality_step == 0 {
            return Err(ExtractError::InvalidConfig(
                "quality_step must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_constants() {
        let c = ExtractionConfig::default();
        assert_eq!(c.limits.max_dimension, 2000);
        assert_eq!(c.limits.max_bytes, 5_242_880);
        assert_eq!(c.limits.initial_quality, 85);
        assert_eq!(c.limits.quality_step, 5);
        assert_eq!(c.limits.min_quality, 5);
        assert_eq!(c.provider_name, "anthropic");
        assert_eq!(c.model, "claude-3-haiku-20240307");
        assert_eq!(c.max_tokens, 1000);
        assert!(c.temperature.is_none());
    }

    #[test]
    fn builder_rejects_zero_step() {
        let err = ExtractionConfig::builder().quality_step(0).build().unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_quality_above_100() {
        let err = ExtractionConfig::builder()
            .initial_quality(101)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("101"));
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ExtractionConfig::builder().temperature(7.0).build().unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn debug_hides_callback_and_prompt() {
        let c = ExtractionConfig::builder()
            .instruction("secret prompt")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret prompt"));
        assert!(dbg.contains("<custom>"));
    }
}
