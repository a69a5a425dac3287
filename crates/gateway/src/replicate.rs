//! Client for the Replicate predictions API.
//!
//! Predictions are created with `Prefer: wait` so short runs complete in the
//! creating request. Longer runs come back as `starting`/`processing` and
//! are polled through their `urls.get` link until they reach a terminal
//! status.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::gateway::ImageRequest;

const PROVIDER: &str = "replicate";

/// HTTP client for the Replicate API.
pub struct ReplicateClient {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    timeout: Duration,
    poll_interval: Duration,
}

/// A prediction as returned by `POST /predictions` and `GET urls.get`.
#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
}

/// Where a prediction currently stands.
#[derive(Debug)]
enum PredictionState {
    Pending(String),
    Succeeded(Vec<String>),
}

impl ReplicateClient {
    /// Create a client reusing an existing [`reqwest::Client`].
    ///
    /// * `api_url` - Base URL, e.g. `https://api.replicate.com/v1`.
    pub fn new(
        client: reqwest::Client,
        api_url: String,
        api_token: String,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token,
            timeout,
            poll_interval,
        }
    }

    /// Run `version` on `request` and return the output image URLs.
    ///
    /// Polls until the prediction finishes; the caller bounds the total time.
    pub async fn generate(
        &self,
        version: &str,
        request: &ImageRequest,
    ) -> Result<Vec<String>, ProviderError> {
        let body = serde_json::json!({
            "version": version,
            "input": prediction_input(request),
        });

        let response = self
            .client
            .post(format!("{}/predictions", self.api_url))
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e, self.timeout))?;

        let mut prediction = self.parse_prediction(response).await?;
        loop {
            match classify(prediction)? {
                PredictionState::Succeeded(images) => return Ok(images),
                PredictionState::Pending(poll_url) => {
                    tokio::time::sleep(self.poll_interval).await;
                    let response = self
                        .client
                        .get(&poll_url)
                        .bearer_auth(&self.api_token)
                        .send()
                        .await
                        .map_err(|e| ProviderError::from_reqwest(PROVIDER, e, self.timeout))?;
                    prediction = self.parse_prediction(response).await?;
                }
            }
        }
    }

    async fn parse_prediction(
        &self,
        response: reqwest::Response,
    ) -> Result<Prediction, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<Prediction>()
            .await
            .map_err(|e| ProviderError::Malformed {
                provider: PROVIDER,
                detail: e.to_string(),
            })
    }
}

/// Build the model input object for an SDXL-style prediction.
fn prediction_input(request: &ImageRequest) -> Value {
    let options = &request.options;
    serde_json::json!({
        "prompt": request.prompt,
        "negative_prompt": request.negative_prompt,
        "width": options.width,
        "height": options.height,
        "num_outputs": options.output_count,
        "scheduler": options.sampler.scheduler,
        "num_inference_steps": options.sampler.inference_steps,
        "guidance_scale": options.sampler.guidance_scale,
    })
}

/// Turn a prediction into its state, or the error it terminated with.
fn classify(prediction: Prediction) -> Result<PredictionState, ProviderError> {
    match prediction.status.as_str() {
        "succeeded" => output_urls(prediction.output).map(PredictionState::Succeeded),
        "starting" | "processing" => {
            let url = prediction.urls.map(|u| u.get).ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER,
                detail: format!("prediction {} is pending but has no poll URL", prediction.id),
            })?;
            Ok(PredictionState::Pending(url))
        }
        "failed" => {
            let detail = error_text(&prediction.error);
            if detail.to_ascii_lowercase().contains("nsfw") {
                Err(ProviderError::ContentPolicy {
                    provider: PROVIDER,
                    detail,
                })
            } else {
                Err(ProviderError::Failed {
                    provider: PROVIDER,
                    detail,
                })
            }
        }
        "canceled" => Err(ProviderError::Failed {
            provider: PROVIDER,
            detail: format!("prediction {} was canceled", prediction.id),
        }),
        other => Err(ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("unknown prediction status '{other}'"),
        }),
    }
}

/// Output is either a list of URLs or, for single-output models, one URL.
fn output_urls(output: Value) -> Result<Vec<String>, ProviderError> {
    let malformed = |detail: &str| ProviderError::Malformed {
        provider: PROVIDER,
        detail: detail.to_string(),
    };
    match output {
        Value::String(url) => Ok(vec![url]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(url) => Ok(url),
                _ => Err(malformed("prediction output contains a non-string entry")),
            })
            .collect(),
        _ => Err(malformed("succeeded prediction has no output")),
    }
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Null => "prediction failed without an error message".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::gateway::ImageOptions;

    fn prediction(json: Value) -> Prediction {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn input_carries_sampler_settings() {
        let request = ImageRequest {
            prompt: "a bright room".into(),
            negative_prompt: "blurry".into(),
            options: ImageOptions::default(),
        };
        let input = prediction_input(&request);
        assert_eq!(input["negative_prompt"], "blurry");
        assert_eq!(input["width"], 1024);
        assert_eq!(input["height"], 768);
        assert_eq!(input["num_outputs"], 1);
        assert_eq!(input["scheduler"], "K_EULER");
        assert_eq!(input["num_inference_steps"], 30);
        assert_eq!(input["guidance_scale"], 7.5);
    }

    #[test]
    fn succeeded_with_array_output() {
        let p = prediction(serde_json::json!({
            "id": "p1", "status": "succeeded", "output": ["https://cdn/a.png", "https://cdn/b.png"]
        }));
        assert_matches!(classify(p), Ok(PredictionState::Succeeded(urls)) if urls.len() == 2);
    }

    #[test]
    fn succeeded_with_single_string_output() {
        let p = prediction(serde_json::json!({
            "id": "p1", "status": "succeeded", "output": "https://cdn/a.png"
        }));
        assert_matches!(classify(p), Ok(PredictionState::Succeeded(urls)) if urls == ["https://cdn/a.png"]);
    }

    #[test]
    fn processing_returns_poll_url() {
        let p = prediction(serde_json::json!({
            "id": "p1", "status": "processing", "urls": {"get": "https://api/p1"}
        }));
        assert_matches!(classify(p), Ok(PredictionState::Pending(url)) if url == "https://api/p1");
    }

    #[test]
    fn nsfw_failure_is_content_policy() {
        let p = prediction(serde_json::json!({
            "id": "p1", "status": "failed", "error": "NSFW content detected. Try running it again."
        }));
        assert_matches!(classify(p), Err(ProviderError::ContentPolicy { .. }));
    }

    #[test]
    fn other_failure_is_failed() {
        let p = prediction(serde_json::json!({
            "id": "p1", "status": "failed", "error": "CUDA out of memory"
        }));
        assert_matches!(classify(p), Err(ProviderError::Failed { detail, .. }) if detail == "CUDA out of memory");
    }

    #[test]
    fn succeeded_without_output_is_malformed() {
        let p = prediction(serde_json::json!({ "id": "p1", "status": "succeeded" }));
        assert_matches!(classify(p), Err(ProviderError::Malformed { .. }));
    }
}
