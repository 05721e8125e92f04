use async_trait::async_trait;

use crate::utils::error::AppError;

/// Trait for implementing notification transports (Telegram, ...)
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &'static str;

    /// Deliver one Markdown-formatted message. Fails with
    /// [`AppError::Transport`] on a non-2xx response or a network timeout.
    async fn deliver(&self, text: &str) -> Result<(), AppError>;
}
