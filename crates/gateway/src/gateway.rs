//! The model capability interface consumed by the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Default output width in pixels.
pub const DEFAULT_WIDTH: u32 = 1024;
/// Default output height in pixels.
pub const DEFAULT_HEIGHT: u32 = 768;
/// Default scheduler passed to the diffusion model.
pub const DEFAULT_SCHEDULER: &str = "K_EULER";
/// Default number of denoising steps.
pub const DEFAULT_INFERENCE_STEPS: u32 = 30;
/// Default classifier-free guidance scale.
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;

/// Uniform access to the three external model roles.
///
/// Implementations hold no conversation state: every call is single-shot.
/// They perform no retries and no caching.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Describe the image at `image_url` following `instruction`.
    async fn vision_to_text(
        &self,
        image_url: &str,
        instruction: &str,
    ) -> Result<String, ProviderError>;

    /// Complete a text prompt.
    async fn text_to_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Render images for a prompt. Returns image references in provider
    /// order; callers use the first one.
    async fn text_to_image(&self, request: &ImageRequest) -> Result<Vec<String>, ProviderError>;
}

/// Sampler settings forwarded to the diffusion model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub scheduler: String,
    pub inference_steps: u32,
    pub guidance_scale: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            scheduler: DEFAULT_SCHEDULER.to_string(),
            inference_steps: DEFAULT_INFERENCE_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
        }
    }
}

/// Output shape of an image request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    pub width: u32,
    pub height: u32,
    pub output_count: u32,
    pub sampler: SamplerConfig,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            output_count: 1,
            sampler: SamplerConfig::default(),
        }
    }
}

/// A text-to-image request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub options: ImageOptions,
}
