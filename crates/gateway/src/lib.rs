//! Provider-agnostic access to the three model roles the pipeline needs:
//! vision-to-text, text-to-text and text-to-image.
//!
//! [`ModelGateway`] is the seam the pipeline depends on. [`HttpModelGateway`]
//! is the production implementation, built from an explicit
//! [`GatewayConfig`]; it talks to an OpenAI-compatible chat completions API
//! for the two text roles and to Replicate for image synthesis.
//!
//! The gateway never retries and never caches. Both are pipeline concerns.

pub mod chat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod replicate;

pub use config::GatewayConfig;
pub use error::ProviderError;
pub use gateway::{ImageOptions, ImageRequest, ModelGateway, SamplerConfig};
pub use http::HttpModelGateway;
