//! Production [`ModelGateway`] over HTTP providers.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::chat::ChatCompletionsClient;
use crate::config::GatewayConfig;
use crate::error::ProviderError;
use crate::gateway::{ImageRequest, ModelGateway};
use crate::replicate::ReplicateClient;

/// [`ModelGateway`] backed by an OpenAI-compatible chat API (vision and text
/// roles) and Replicate (image role).
///
/// Every call is bounded by [`GatewayConfig::call_timeout`], covering the
/// whole exchange including image polling.
pub struct HttpModelGateway {
    config: GatewayConfig,
    chat: ChatCompletionsClient,
    replicate: ReplicateClient,
}

impl HttpModelGateway {
    /// Build the gateway and its HTTP clients from `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.call_timeout)
            .build()
            .map_err(|source| ProviderError::Transport {
                provider: "http",
                source,
            })?;

        let chat = ChatCompletionsClient::new(
            client.clone(),
            config.chat_api_base_url.clone(),
            config.chat_api_key.clone(),
            config.call_timeout,
        );
        let replicate = ReplicateClient::new(
            client,
            config.replicate_api_base_url.clone(),
            config.replicate_api_token.clone(),
            config.call_timeout,
            config.poll_interval,
        );

        Ok(Self {
            config,
            chat,
            replicate,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run `call` under the per-call timeout and log its latency.
    async fn bounded<T, F>(
        &self,
        provider: &'static str,
        model: &str,
        call: F,
    ) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider,
                timeout: self.config.call_timeout,
            }),
        };
        let elapsed_ms = elapsed_ms(started.elapsed());
        match &result {
            Ok(_) => tracing::debug!(provider, model, elapsed_ms, "Model call succeeded"),
            Err(e) => tracing::warn!(provider, model, elapsed_ms, error = %e, "Model call failed"),
        }
        result
    }
}

#[async_trait]
impl ModelGateway for HttpModelGateway {
    async fn vision_to_text(
        &self,
        image_url: &str,
        instruction: &str,
    ) -> Result<String, ProviderError> {
        let role = &self.config.vision;
        self.bounded(
            "chat",
            &role.model,
            self.chat.complete_with_image(role, instruction, image_url),
        )
        .await
    }

    async fn text_to_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let role = &self.config.text;
        self.bounded("chat", &role.model, self.chat.complete(role, prompt))
            .await
    }

    async fn text_to_image(&self, request: &ImageRequest) -> Result<Vec<String>, ProviderError> {
        let version = &self.config.image_model_version;
        self.bounded(
            "replicate",
            version,
            self.replicate.generate(version, request),
        )
        .await
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
