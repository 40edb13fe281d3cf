/// Failures surfaced by the sync client. Stored in hook state as text, so
/// the variants carry display messages rather than sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The relay answered with `success: false`, or could not be reached.
    #[error("{0}")]
    Relay(String),

    /// A table read failed for a reason other than "no rows".
    #[error("{0}")]
    Query(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("subscription failed: {0}")]
    Subscribe(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}
