//! Routes WebChat connections to their own conversations.

use crate::config::ChatterboxConfig;
use crate::conversation::Conversation;
use crate::driver::drive;
use crate::random::RngSource;
use crate::schedule::SystemClock;
use anyhow::Result;
use cb_channels::{ConnectionId, InboundMessage, InboundMessageKind, WebChatAdapter};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const CONVERSATION_INBOX_CAPACITY: usize = 16;

pub struct Gateway {
    cfg: Arc<ChatterboxConfig>,
    webchat: Arc<WebChatAdapter>,
    conversations: DashMap<ConnectionId, mpsc::Sender<String>>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
}

impl Gateway {
    pub fn new(
        cfg: Arc<ChatterboxConfig>,
        webchat: Arc<WebChatAdapter>,
        inbound_rx: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        Self {
            cfg,
            webchat,
            conversations: DashMap::new(),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
        }
    }

    pub fn active_conversations(&self) -> usize {
        self.conversations.len()
    }

    pub fn connected_clients(&self) -> usize {
        self.webchat.connection_count()
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run_loop(shutdown).await {
                tracing::error!(%e, "gateway loop exited");
            }
        })
    }

    #[tracing::instrument(level = "info", skip_all)]
    async fn run_loop(self: &Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut rx = self.inbound_rx.lock().await;
        loop {
            let msg = tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!(active = self.conversations.len(), "gateway shutting down");
                    self.conversations.clear();
                    return Ok(());
                }
                msg = rx.recv() => msg,
            };
            let Some(inbound) = msg else {
                return Ok(());
            };
            if let Err(e) = self.handle_inbound(inbound).await {
                tracing::warn!(%e, "handle_inbound failed");
            }
        }
    }

    async fn handle_inbound(self: &Arc<Self>, inbound: InboundMessage) -> Result<()> {
        match inbound.kind {
            InboundMessageKind::Opened => self.open(inbound.connection_id),
            InboundMessageKind::Message => {
                let tx = self
                    .conversations
                    .get(&inbound.connection_id)
                    .map(|entry| entry.value().clone());
                let Some(tx) = tx else {
                    tracing::debug!(
                        connection_id = %inbound.connection_id,
                        "message for finished or unknown conversation dropped"
                    );
                    return Ok(());
                };
                // Never wait on one conversation's inbox; others share this loop.
                match tx.try_send(inbound.content) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            connection_id = %inbound.connection_id,
                            "conversation inbox full; message dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        self.conversations.remove(&inbound.connection_id);
                    }
                }
                Ok(())
            }
            InboundMessageKind::Closed => {
                // Dropping the sender lets the driver drain and exit.
                self.conversations.remove(&inbound.connection_id);
                Ok(())
            }
        }
    }

    fn open(self: &Arc<Self>, connection_id: ConnectionId) -> Result<()> {
        let conversation = Conversation::from_config(
            &self.cfg,
            Box::new(RngSource::from_entropy()),
            Arc::new(SystemClock::new()),
        )?;
        let sink = self.webchat.sink(&connection_id)?;
        let (tx, rx) = mpsc::channel(CONVERSATION_INBOX_CAPACITY);
        self.conversations.insert(connection_id.clone(), tx);

        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            match drive(conversation, &sink, rx).await {
                Ok(()) => {}
                Err(e) => {
                    tracing::debug!(%e, connection_id = %connection_id, "conversation ended early")
                }
            }
            gateway.conversations.remove(&connection_id);
        });
        Ok(())
    }
}
