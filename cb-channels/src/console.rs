use crate::traits::PresentationSink;
use crate::types::Role;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Line-oriented terminal rendering.
pub struct ConsoleSink<W> {
    out: Mutex<W>,
    pending: AtomicBool,
}

impl ConsoleSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleSink<W>
where
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            pending: AtomicBool::new(false),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<W> PresentationSink for ConsoleSink<W>
where
    W: AsyncWrite + Send + Unpin,
{
    async fn append_message(&self, text: &str, role: Role) -> Result<()> {
        self.write_line(&format!("{:>4}: {text}", role.as_str()))
            .await
    }

    async fn append_source_caption(&self, label: &str, url: &str) -> Result<()> {
        self.write_line(&format!("      Source: {label} <{url}>"))
            .await
    }

    async fn show_pending_indicator(&self) -> Result<()> {
        if self.pending.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.write_line("      Processing...").await
    }

    async fn hide_pending_indicator(&self) -> Result<()> {
        self.pending.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn disable_input(&self, placeholder: &str) -> Result<()> {
        self.write_line(&format!("[{placeholder}]")).await
    }
}
