use crate::traits::PresentationSink;
use crate::types::{RenderEvent, Role};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records every render in order. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RenderEvent>>,
    pending: AtomicBool,
    disabled: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Bot message texts in render order.
    pub fn bot_messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RenderEvent::Message {
                    role: Role::Bot,
                    content,
                } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn captions(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RenderEvent::Source { label, url } => Some((label, url)),
                _ => None,
            })
            .collect()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_input_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn push(&self, event: RenderEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[async_trait]
impl PresentationSink for MemorySink {
    async fn append_message(&self, text: &str, role: Role) -> Result<()> {
        self.push(RenderEvent::Message {
            role,
            content: text.to_string(),
        });
        Ok(())
    }

    async fn append_source_caption(&self, label: &str, url: &str) -> Result<()> {
        self.push(RenderEvent::Source {
            label: label.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }

    async fn show_pending_indicator(&self) -> Result<()> {
        if !self.pending.swap(true, Ordering::SeqCst) {
            self.push(RenderEvent::Typing { active: true });
        }
        Ok(())
    }

    async fn hide_pending_indicator(&self) -> Result<()> {
        if self.pending.swap(false, Ordering::SeqCst) {
            self.push(RenderEvent::Typing { active: false });
        }
        Ok(())
    }

    async fn disable_input(&self, placeholder: &str) -> Result<()> {
        if !self.disabled.swap(true, Ordering::SeqCst) {
            self.push(RenderEvent::InputDisabled {
                placeholder: placeholder.to_string(),
            });
        }
        Ok(())
    }
}
