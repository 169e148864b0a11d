use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API key rejected by the sync daemon (HTTP 401)")]
    AuthRejected,

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("scan of '{path}' failed: {reason}")]
    ScanFailed { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Whether this error must terminate the process.
    ///
    /// Transport and decode failures are transient: the supervisor backs
    /// off and resumes polling. A rejected API key or a failed downstream
    /// scan cannot be retried into success and takes the bridge down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::AuthRejected
                | BridgeError::ScanFailed { .. }
                | BridgeError::Config(_)
                | BridgeError::Internal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
