//! Gateway configuration: endpoints, credentials and per-role models.

use std::time::Duration;

use crate::gateway::ImageOptions;

/// Default OpenAI-compatible endpoint (Groq).
pub const DEFAULT_CHAT_API_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Default vision-capable chat model.
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
/// Default text chat model.
pub const DEFAULT_TEXT_MODEL: &str = "llama-3.3-70b-versatile";
/// Default Replicate API endpoint.
pub const DEFAULT_REPLICATE_API_BASE_URL: &str = "https://api.replicate.com/v1";
/// Default image model version (Stability AI SDXL on Replicate).
pub const DEFAULT_IMAGE_MODEL_VERSION: &str =
    "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";

const DEFAULT_VISION_TEMPERATURE: f32 = 0.2;
const DEFAULT_TEXT_TEMPERATURE: f32 = 0.7;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Model identifier and sampling temperature for one chat role.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRole {
    pub model: String,
    pub temperature: f32,
}

/// Everything needed to construct an [`HttpModelGateway`](crate::HttpModelGateway).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the OpenAI-compatible chat completions API.
    pub chat_api_base_url: String,
    /// Bearer token for the chat API.
    pub chat_api_key: String,
    /// Vision-to-text role.
    pub vision: ChatRole,
    /// Text-to-text role.
    pub text: ChatRole,
    /// Base URL of the Replicate API.
    pub replicate_api_base_url: String,
    /// Bearer token for Replicate.
    pub replicate_api_token: String,
    /// Replicate model version hash used for text-to-image.
    pub image_model_version: String,
    /// Upper bound on one gateway call, including image polling.
    pub call_timeout: Duration,
    /// Delay between polls of an unfinished image prediction.
    pub poll_interval: Duration,
    /// Output size and sampler settings for image requests.
    pub image_options: ImageOptions,
}

impl GatewayConfig {
    /// Build a configuration with default endpoints and models.
    pub fn new(chat_api_key: impl Into<String>, replicate_api_token: impl Into<String>) -> Self {
        Self {
            chat_api_base_url: DEFAULT_CHAT_API_BASE_URL.to_string(),
            chat_api_key: chat_api_key.into(),
            vision: ChatRole {
                model: DEFAULT_VISION_MODEL.to_string(),
                temperature: DEFAULT_VISION_TEMPERATURE,
            },
            text: ChatRole {
                model: DEFAULT_TEXT_MODEL.to_string(),
                temperature: DEFAULT_TEXT_TEMPERATURE,
            },
            replicate_api_base_url: DEFAULT_REPLICATE_API_BASE_URL.to_string(),
            replicate_api_token: replicate_api_token.into(),
            image_model_version: DEFAULT_IMAGE_MODEL_VERSION.to_string(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            image_options: ImageOptions::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Required | Default                         |
    /// |---------------------------|----------|---------------------------------|
    /// | `CHAT_API_KEY`            | **yes**  | --                              |
    /// | `REPLICATE_API_TOKEN`     | **yes**  | --                              |
    /// | `CHAT_API_BASE_URL`       | no       | `https://api.groq.com/openai/v1`|
    /// | `VISION_MODEL`            | no       | Llama 4 Scout                   |
    /// | `TEXT_MODEL`              | no       | `llama-3.3-70b-versatile`       |
    /// | `VISION_TEMPERATURE`      | no       | `0.2`                           |
    /// | `TEXT_TEMPERATURE`        | no       | `0.7`                           |
    /// | `REPLICATE_API_BASE_URL`  | no       | `https://api.replicate.com/v1`  |
    /// | `IMAGE_MODEL_VERSION`     | no       | SDXL                            |
    /// | `MODEL_CALL_TIMEOUT_SECS` | no       | `120`                           |
    /// | `IMAGE_POLL_INTERVAL_MS`  | no       | `1000`                          |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or empty, or if a numeric
    /// variable does not parse.
    pub fn from_env() -> Self {
        let chat_api_key = required_env("CHAT_API_KEY");
        let replicate_api_token = required_env("REPLICATE_API_TOKEN");
        let mut config = Self::new(chat_api_key, replicate_api_token);

        if let Ok(url) = std::env::var("CHAT_API_BASE_URL") {
            config.chat_api_base_url = url;
        }
        if let Ok(model) = std::env::var("VISION_MODEL") {
            config.vision.model = model;
        }
        if let Ok(model) = std::env::var("TEXT_MODEL") {
            config.text.model = model;
        }
        config.vision.temperature = std::env::var("VISION_TEMPERATURE")
            .unwrap_or_else(|_| DEFAULT_VISION_TEMPERATURE.to_string())
            .parse()
            .expect("VISION_TEMPERATURE must be a valid f32");
        config.text.temperature = std::env::var("TEXT_TEMPERATURE")
            .unwrap_or_else(|_| DEFAULT_TEXT_TEMPERATURE.to_string())
            .parse()
            .expect("TEXT_TEMPERATURE must be a valid f32");
        if let Ok(url) = std::env::var("REPLICATE_API_BASE_URL") {
            config.replicate_api_base_url = url;
        }
        if let Ok(version) = std::env::var("IMAGE_MODEL_VERSION") {
            config.image_model_version = version;
        }

        let call_timeout_secs: u64 = std::env::var("MODEL_CALL_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_CALL_TIMEOUT_SECS.to_string())
            .parse()
            .expect("MODEL_CALL_TIMEOUT_SECS must be a valid u64");
        config.call_timeout = Duration::from_secs(call_timeout_secs);

        let poll_interval_ms: u64 = std::env::var("IMAGE_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_MS.to_string())
            .parse()
            .expect("IMAGE_POLL_INTERVAL_MS must be a valid u64");
        config.poll_interval = Duration::from_millis(poll_interval_ms);

        config
    }
}

fn required_env(key: &str) -> String {
    let value = std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set in the environment"));
    assert!(!value.is_empty(), "{key} must not be empty");
    value
}
