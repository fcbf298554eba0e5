use crate::types::Role;
use anyhow::Result;
use async_trait::async_trait;

/// Append-only rendering surface for one conversation.
#[async_trait]
pub trait PresentationSink: Send + Sync {
    async fn append_message(&self, text: &str, role: Role) -> Result<()>;

    /// Decorative "Source:" line shown under a bot message.
    async fn append_source_caption(&self, label: &str, url: &str) -> Result<()>;

    /// Show the transient "Processing..." indicator. No-op when already shown.
    async fn show_pending_indicator(&self) -> Result<()>;

    /// Remove the indicator. No-op when nothing is showing.
    async fn hide_pending_indicator(&self) -> Result<()>;

    /// Permanently disable the input surface and swap its placeholder text.
    async fn disable_input(&self, placeholder: &str) -> Result<()>;
}
