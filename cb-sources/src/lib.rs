//! Content sources for Chatterbox.
//!
//! Pure HTTP + buffering: upstream adapters turn remote payloads into
//! [`Item`]s, banks hold prefetched items, and [`ContentSource`] variants
//! hand one item out per draw.

mod bank;
mod client;
mod error;
mod html;
mod source;
mod types;
mod upstream;

pub use bank::Bank;
pub use client::ContentClient;
pub use error::{Result, SourceError};
pub use html::decode_entities;
pub use source::{BankSource, ContentSource, LayeredSource, LiveSource};
pub use types::{ContentKind, ExcusePayload, Item};
pub use upstream::Upstream;
