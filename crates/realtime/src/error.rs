#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimeError {
    #[error("Realtime store not initialized. Configure the value store connection first.")]
    NotConfigured,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Subscription to {path} failed: {message}")]
    SubscribeFailed { path: String, message: String },

    #[error("Realtime store error: {0}")]
    Store(String),
}
