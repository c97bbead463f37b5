use thiserror::Error;

/// Main error type for the validator metrics pipeline
#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Upstream fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures talking to the explorer API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("upstream did not respond within {0}s")]
    Timeout(u64),

    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("upstream body is not a validator record: {0}")]
    MalformedBody(String),

    #[error("upstream reported failure: {0}")]
    UnsuccessfulBusinessStatus(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Failures while deriving metrics from a raw record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("transform panicked: {0}")]
    Panicked(String),
}

/// Result type alias for pipeline operations
pub type PulseResult<T> = Result<T, PulseError>;

impl FetchError {
    /// Short machine-usable classification tag
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::UpstreamStatus(_) => "upstream_status",
            FetchError::MalformedBody(_) => "malformed_body",
            FetchError::UnsuccessfulBusinessStatus(_) => "unsuccessful_business_status",
            FetchError::Transport(_) => "transport",
        }
    }

    /// Check if another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Transport(_) => true,
            FetchError::UpstreamStatus(code) => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

impl PulseError {
    /// Short machine-usable classification tag
    pub fn kind(&self) -> &'static str {
        match self {
            PulseError::Fetch(e) => e.kind(),
            PulseError::Transform(_) => "transform",
            PulseError::Config(_) => "config",
            PulseError::Io(_) => "io",
            PulseError::Internal(_) => "internal",
        }
    }

    /// `kind: message`, the form carried in a fallback envelope's `error` field
    pub fn describe(&self) -> String {
        match self {
            PulseError::Fetch(e) => format!("{}: {}", e.kind(), e),
            PulseError::Transform(e) => format!("transform: {}", e),
            other => format!("{}: {}", other.kind(), other),
        }
    }
}
