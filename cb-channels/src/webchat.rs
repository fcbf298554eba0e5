use crate::traits::PresentationSink;
use crate::types::{ConnectionId, InboundMessage, InboundMessageKind, RenderEvent, Role};
use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Clone)]
struct WebChatState {
    inbound_tx: Arc<tokio::sync::RwLock<Option<mpsc::Sender<InboundMessage>>>>,
    connections: Arc<DashMap<ConnectionId, mpsc::UnboundedSender<Message>>>,
}

/// WebSocket chat surface. Every socket is its own conversation.
#[derive(Clone)]
pub struct WebChatAdapter {
    state: WebChatState,
}

impl Default for WebChatAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WebChatAdapter {
    pub fn new() -> Self {
        Self {
            state: WebChatState {
                inbound_tx: Arc::new(tokio::sync::RwLock::new(None)),
                connections: Arc::new(DashMap::new()),
            },
        }
    }

    /// Router that serves the WebChat WebSocket at `/ws`.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().route("/ws", get(ws_upgrade)).with_state(self)
    }

    /// Route inbound events (open, message, close) to `tx`.
    pub async fn start(&self, tx: mpsc::Sender<InboundMessage>) {
        *self.state.inbound_tx.write().await = Some(tx);
    }

    pub fn connection_count(&self) -> usize {
        self.state.connections.len()
    }

    /// Sink that renders into the socket behind `connection_id`.
    pub fn sink(&self, connection_id: &ConnectionId) -> Result<WebChatSink> {
        let Some(conn) = self.state.connections.get(connection_id) else {
            return Err(anyhow::anyhow!(
                "webchat connection not found for connection_id={connection_id}"
            ));
        };
        Ok(WebChatSink {
            connection_id: connection_id.clone(),
            outbound: conn.value().clone(),
            pending: AtomicBool::new(false),
        })
    }

    async fn forward(&self, inbound: InboundMessage) -> Result<()> {
        let tx = self.state.inbound_tx.read().await.clone();
        let Some(tx) = tx else {
            return Err(anyhow::anyhow!(
                "webchat adapter started without inbound queue"
            ));
        };
        tx.send(inbound)
            .await
            .map_err(|e| anyhow::anyhow!("webchat inbound queue closed: {e}"))
    }
}

async fn ws_upgrade(
    State(adapter): State<Arc<WebChatAdapter>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(adapter, socket))
}

#[tracing::instrument(level = "info", skip_all)]
async fn handle_socket(adapter: Arc<WebChatAdapter>, socket: WebSocket) {
    let connection_id = ConnectionId::new(Uuid::new_v4().to_string());
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    adapter
        .state
        .connections
        .insert(connection_id.clone(), outbound_tx);

    let hello = serde_json::json!({ "type": "hello", "connection_id": connection_id });
    if ws_sender
        .send(Message::Text(hello.to_string().into()))
        .await
        .is_err()
    {
        adapter.state.connections.remove(&connection_id);
        return;
    }

    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let opened = InboundMessage::new(
        InboundMessageKind::Opened,
        connection_id.clone(),
        String::new(),
    );
    if let Err(e) = adapter.forward(opened).await {
        tracing::error!(%e, connection_id = %connection_id, "webchat could not open conversation");
    } else {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let content = match parse_client_message(&text) {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(%e, connection_id = %connection_id, "webchat invalid payload");
                    break;
                }
            };
            let inbound =
                InboundMessage::new(InboundMessageKind::Message, connection_id.clone(), content);
            if let Err(e) = adapter.forward(inbound).await {
                tracing::error!(%e, connection_id = %connection_id, "webchat inbound forward failed");
                break;
            }
        }

        let closed = InboundMessage::new(
            InboundMessageKind::Closed,
            connection_id.clone(),
            String::new(),
        );
        if let Err(e) = adapter.forward(closed).await {
            tracing::debug!(%e, connection_id = %connection_id, "webchat close not delivered");
        }
    }

    outbound_task.abort();
    adapter.state.connections.remove(&connection_id);
}

fn parse_client_message(text: &str) -> Result<String> {
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| anyhow::anyhow!("webchat received invalid json: {e}"))?;
    let msg_type = parsed
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("webchat payload missing type"))?;
    if msg_type != "message" {
        return Err(anyhow::anyhow!(
            "webchat unsupported message type: {msg_type}"
        ));
    }
    parsed
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("webchat message missing content"))
}

/// Per-connection sink handed to a conversation.
pub struct WebChatSink {
    connection_id: ConnectionId,
    outbound: mpsc::UnboundedSender<Message>,
    pending: AtomicBool,
}

impl WebChatSink {
    fn send_event(&self, event: RenderEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        self.outbound
            .send(Message::Text(payload.into()))
            .map_err(|_| {
                anyhow::anyhow!(
                    "webchat send failed: socket closed for connection_id={}",
                    self.connection_id
                )
            })
    }
}

#[async_trait]
impl PresentationSink for WebChatSink {
    async fn append_message(&self, text: &str, role: Role) -> Result<()> {
        self.send_event(RenderEvent::Message {
            role,
            content: text.to_string(),
        })
    }

    async fn append_source_caption(&self, label: &str, url: &str) -> Result<()> {
        self.send_event(RenderEvent::Source {
            label: label.to_string(),
            url: url.to_string(),
        })
    }

    async fn show_pending_indicator(&self) -> Result<()> {
        if self.pending.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.send_event(RenderEvent::Typing { active: true })
    }

    async fn hide_pending_indicator(&self) -> Result<()> {
        if !self.pending.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.send_event(RenderEvent::Typing { active: false })
    }

    async fn disable_input(&self, placeholder: &str) -> Result<()> {
        self.send_event(RenderEvent::InputDisabled {
            placeholder: placeholder.to_string(),
        })
    }
}
