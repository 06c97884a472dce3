use thiserror::Error;

/// Failures talking to an external provider. Callers degrade, never abort.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured")]
    Disabled,
    #[error("provider in backoff after recent failures")]
    BackingOff,
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}
