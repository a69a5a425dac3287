use std::time::Duration;

/// Failure of a single upstream model call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider returned a non-2xx status code.
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response arrived but did not have the documented shape.
    #[error("{provider} returned a malformed response: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },

    /// The provider refused the request under its content policy.
    #[error("{provider} rejected the request under its content policy: {detail}")]
    ContentPolicy {
        provider: &'static str,
        detail: String,
    },

    /// The provider accepted the request but reported that it failed.
    #[error("{provider} reported a failed generation: {detail}")]
    Failed {
        provider: &'static str,
        detail: String,
    },

    /// No complete response within the configured per-call timeout.
    #[error("{provider} did not respond within {}s", .timeout.as_secs())]
    Timeout {
        provider: &'static str,
        timeout: Duration,
    },
}

impl ProviderError {
    /// Build an error from a [`reqwest::Error`], classifying client-side
    /// timeouts separately from other transport failures.
    pub fn from_reqwest(provider: &'static str, source: reqwest::Error, timeout: Duration) -> Self {
        if source.is_timeout() {
            Self::Timeout { provider, timeout }
        } else {
            Self::Transport { provider, source }
        }
    }

    /// Whether repeating the identical call could plausibly succeed.
    ///
    /// Content-policy rejections, malformed responses and 4xx statuses other
    /// than 408/429 are deterministic for a given request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } | Self::Failed { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Malformed { .. } | Self::ContentPolicy { .. } => false,
        }
    }
}
