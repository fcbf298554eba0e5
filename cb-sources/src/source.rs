use crate::bank::Bank;
use crate::client::ContentClient;
use crate::error::{Result, SourceError};
use crate::types::{ContentKind, Item};
use async_trait::async_trait;

/// Hands out one [`Item`] per draw.
///
/// Exhaustion and remote failures come back as [`SourceError`]; deciding what
/// the user sees instead is the caller's job.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn kind(&self) -> ContentKind;

    /// Short label for logs: "bank", "live", "layered".
    fn mode(&self) -> &'static str;

    async fn draw(&self) -> Result<Item>;
}

pub struct BankSource {
    bank: Bank,
}

impl BankSource {
    pub fn new(bank: Bank) -> Self {
        Self { bank }
    }
}

#[async_trait]
impl ContentSource for BankSource {
    fn kind(&self) -> ContentKind {
        self.bank.kind()
    }

    fn mode(&self) -> &'static str {
        "bank"
    }

    async fn draw(&self) -> Result<Item> {
        self.bank
            .pop()
            .await
            .ok_or(SourceError::BankExhausted(self.bank.kind()))
    }
}

pub struct LiveSource {
    client: ContentClient,
}

impl LiveSource {
    pub fn new(client: ContentClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentSource for LiveSource {
    fn kind(&self) -> ContentKind {
        self.client.kind()
    }

    fn mode(&self) -> &'static str {
        "live"
    }

    async fn draw(&self) -> Result<Item> {
        self.client.fetch_one().await
    }
}

/// Bank first; once it is exhausted every draw goes to the live endpoint.
pub struct LayeredSource {
    bank: BankSource,
    live: LiveSource,
}

impl LayeredSource {
    pub fn new(bank: Bank, client: ContentClient) -> Result<Self> {
        if bank.kind() != client.kind() {
            return Err(SourceError::InvalidConfig(format!(
                "layered source mixes {} bank with {} upstream",
                bank.kind(),
                client.kind()
            )));
        }
        Ok(Self {
            bank: BankSource::new(bank),
            live: LiveSource::new(client),
        })
    }
}

#[async_trait]
impl ContentSource for LayeredSource {
    fn kind(&self) -> ContentKind {
        self.bank.kind()
    }

    fn mode(&self) -> &'static str {
        "layered"
    }

    async fn draw(&self) -> Result<Item> {
        match self.bank.draw().await {
            Err(SourceError::BankExhausted(kind)) => {
                tracing::debug!(%kind, "bank exhausted; drawing live");
                self.live.draw().await
            }
            other => other,
        }
    }
}
