use crate::client::ContentClient;
use crate::types::{ContentKind, Item};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct BankState {
    items: Vec<Item>,
    loaded: bool,
}

/// Prefetched items for one content kind, consumed last-in-first-out.
///
/// A bank is filled at most once. After it drains it stays empty; callers
/// treat that as a normal terminal state, not an error.
#[derive(Debug, Clone)]
pub struct Bank {
    kind: ContentKind,
    state: Arc<Mutex<BankState>>,
}

impl Bank {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(BankState::default())),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Fill the bank. Returns false (and keeps the current contents) when the
    /// bank was already loaded once.
    pub async fn load(&self, items: Vec<Item>) -> bool {
        let mut state = self.state.lock().await;
        if state.loaded {
            tracing::warn!(kind = %self.kind, "bank already loaded; ignoring refill");
            return false;
        }
        state.items = items;
        state.loaded = true;
        true
    }

    pub async fn pop(&self) -> Option<Item> {
        self.state.lock().await.items.pop()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// One batch request; on failure the bank is left empty and nothing is retried.
    #[tracing::instrument(level = "info", skip_all, fields(kind = %self.kind, amount = amount))]
    pub async fn preload(&self, client: &ContentClient, amount: usize) -> usize {
        match client.fetch_batch(amount).await {
            Ok(items) => {
                let count = items.len();
                if self.load(items).await {
                    tracing::info!(items = count, "bank preloaded");
                }
                count
            }
            Err(e) => {
                tracing::warn!(error = %e, error_kind = e.label(), "bank preload failed");
                0
            }
        }
    }
}
