//! Presentation sinks for Chatterbox.
//!
//! Sinks are pure I/O: they render what a conversation decides to show and
//! carry user input back in as `InboundMessage`s.

mod console;
mod memory;
mod traits;
mod types;
mod webchat;

pub use console::ConsoleSink;
pub use memory::MemorySink;
pub use traits::PresentationSink;
pub use types::{ConnectionId, InboundMessage, InboundMessageKind, RenderEvent, Role};
pub use webchat::{WebChatAdapter, WebChatSink};
