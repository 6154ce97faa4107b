use durable_helpers_core::HelperError;
use thiserror::Error;

/// Error types for the test host
#[derive(Debug, Error)]
pub enum TestHostError {
    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Helper error raised while setting up the host
    #[error(transparent)]
    Helper(#[from] HelperError),

    /// A dummy request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The host was built without an orchestration client
    #[error("No orchestration client configured")]
    MissingClient,

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}
