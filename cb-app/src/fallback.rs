//! Turns a source draw into something renderable, whatever happened.

use crate::random::RandomSource;
use crate::schedule::{Deferred, Scheduler};
use crate::termination::sign_off_text;
use anyhow::Result;
use cb_channels::{PresentationSink, Role};
use cb_sources::{ContentKind, ContentSource, Item, SourceError};
use std::time::Duration;

/// A successful draw, ready to render as message + caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentResult {
    pub kind: ContentKind,
    pub display_text: String,
    pub source_label: String,
    /// Decorative link shown with the caption; flavor only.
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Content(ContentResult),
    /// Fixed literal used when the source failed or ran dry. Has no caption.
    Fallback { kind: ContentKind, text: String },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Self::Content(c) => &c.display_text,
            Self::Fallback { text, .. } => text,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Content(c) => c.kind,
            Self::Fallback { kind, .. } => *kind,
        }
    }

    pub fn fell_back(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Render the message now and queue its caption `caption_delay` later.
    pub async fn render(
        &self,
        sink: &dyn PresentationSink,
        scheduler: &mut Scheduler,
        caption_delay: Duration,
    ) -> Result<()> {
        sink.append_message(self.text(), Role::Bot).await?;
        if let Self::Content(content) = self {
            scheduler.schedule(
                caption_delay,
                Deferred::SourceCaption {
                    label: content.source_label.clone(),
                    url: content.link.clone(),
                },
            );
        }
        Ok(())
    }
}

/// What the user sees for one kind: its fallback literal and caption label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindProfile {
    pub kind: ContentKind,
    pub fallback: String,
    pub caption: String,
}

pub struct FallbackPolicy {
    links: Vec<String>,
}

impl FallbackPolicy {
    pub fn new(links: Vec<String>) -> Result<Self> {
        if links.is_empty() {
            return Err(anyhow::anyhow!(
                "fallback policy needs at least one decorative link"
            ));
        }
        Ok(Self { links })
    }

    /// Draw once from `source`. Never fails: any error becomes the profile's
    /// fallback literal.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(kind = %profile.kind, mode = source.mode())
    )]
    pub async fn resolve(
        &self,
        source: &dyn ContentSource,
        profile: &KindProfile,
        rng: &mut dyn RandomSource,
    ) -> Reply {
        let drawn = match source.draw().await {
            Ok(item) if item.kind() == profile.kind => Ok(item),
            Ok(item) => Err(SourceError::MalformedResponse(format!(
                "{} source returned {} item",
                profile.kind,
                item.kind()
            ))),
            Err(e) => Err(e),
        };

        match drawn {
            Ok(item) => Reply::Content(self.to_content(item, profile, rng)),
            Err(e) => {
                tracing::warn!(
                    kind = %profile.kind,
                    mode = source.mode(),
                    error_kind = e.label(),
                    error = %e,
                    "content source failed; using fallback"
                );
                Reply::Fallback {
                    kind: profile.kind,
                    text: profile.fallback.clone(),
                }
            }
        }
    }

    fn to_content(
        &self,
        item: Item,
        profile: &KindProfile,
        rng: &mut dyn RandomSource,
    ) -> ContentResult {
        let (display_text, source_label) = match item {
            Item::Fact { text } => (text, profile.caption.clone()),
            Item::Question { text, category } => (text, format!("Category: {category}")),
            Item::Excuse(payload) => (sign_off_text(&payload), profile.caption.clone()),
        };
        ContentResult {
            kind: profile.kind,
            display_text,
            source_label,
            link: self.pick_link(rng),
        }
    }

    fn pick_link(&self, rng: &mut dyn RandomSource) -> String {
        self.links[rng.index(self.links.len())].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use async_trait::async_trait;
    use cb_sources::{Bank, BankSource, ExcusePayload};

    struct Failing(ContentKind, fn() -> SourceError);

    #[async_trait]
    impl ContentSource for Failing {
        fn kind(&self) -> ContentKind {
            self.0
        }

        fn mode(&self) -> &'static str {
            "failing"
        }

        async fn draw(&self) -> cb_sources::Result<Item> {
            Err((self.1)())
        }
    }

    struct Fixed(Item);

    #[async_trait]
    impl ContentSource for Fixed {
        fn kind(&self) -> ContentKind {
            self.0.kind()
        }

        fn mode(&self) -> &'static str {
            "fixed"
        }

        async fn draw(&self) -> cb_sources::Result<Item> {
            Ok(self.0.clone())
        }
    }

    fn links() -> Vec<String> {
        (0..6).map(|i| format!("https://link{i}.example/")).collect()
    }

    fn profile(kind: ContentKind) -> KindProfile {
        KindProfile {
            kind,
            fallback: format!("{kind} fallback"),
            caption: "The Cat's Meow".to_string(),
        }
    }

    #[tokio::test]
    async fn every_failure_kind_becomes_the_kind_literal() {
        let policy = FallbackPolicy::new(links()).expect("policy");
        let mut rng = ScriptedRandom::new([0.1]);
        let failures: [fn() -> SourceError; 3] = [
            || SourceError::Transport("connection reset".into()),
            || SourceError::BankExhausted(ContentKind::Question),
            || SourceError::MalformedResponse("missing field: question".into()),
        ];

        for failure in failures {
            let source = Failing(ContentKind::Question, failure);
            let reply = policy
                .resolve(&source, &profile(ContentKind::Question), &mut rng)
                .await;
            assert_eq!(
                reply,
                Reply::Fallback {
                    kind: ContentKind::Question,
                    text: "question fallback".to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn questions_caption_with_category_and_pick_a_link() {
        let policy = FallbackPolicy::new(links()).expect("policy");
        let mut rng = ScriptedRandom::new([0.5]);
        let source = Fixed(Item::Question {
            text: "Is a hotdog a sandwich?".to_string(),
            category: "Food & Drink".to_string(),
        });

        let reply = policy
            .resolve(&source, &profile(ContentKind::Question), &mut rng)
            .await;
        assert_eq!(
            reply,
            Reply::Content(ContentResult {
                kind: ContentKind::Question,
                display_text: "Is a hotdog a sandwich?".to_string(),
                source_label: "Category: Food & Drink".to_string(),
                link: "https://link3.example/".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn facts_use_the_fixed_caption() {
        let policy = FallbackPolicy::new(links()).expect("policy");
        let mut rng = ScriptedRandom::new([0.0]);
        let bank = Bank::new(ContentKind::Fact);
        bank.load(vec![Item::Fact {
            text: "Cats sleep 16 hours a day.".to_string(),
        }])
        .await;
        let source = BankSource::new(bank);

        let first = policy
            .resolve(&source, &profile(ContentKind::Fact), &mut rng)
            .await;
        let Reply::Content(content) = first else {
            panic!("expected content, got {first:?}");
        };
        assert_eq!(content.source_label, "The Cat's Meow");
        assert_eq!(content.link, "https://link0.example/");

        let second = policy
            .resolve(&source, &profile(ContentKind::Fact), &mut rng)
            .await;
        assert!(second.fell_back());
        assert_eq!(second.text(), "fact fallback");
    }

    #[tokio::test]
    async fn item_of_the_wrong_kind_is_treated_as_malformed() {
        let policy = FallbackPolicy::new(links()).expect("policy");
        let mut rng = ScriptedRandom::new([0.0]);
        let source = Fixed(Item::Excuse(ExcusePayload::Phrase {
            phrase: "circle back".to_string(),
        }));

        let reply = policy
            .resolve(&source, &profile(ContentKind::Fact), &mut rng)
            .await;
        assert!(reply.fell_back());
        assert_eq!(reply.kind(), ContentKind::Fact);
    }

    #[test]
    fn empty_link_set_is_rejected() {
        assert!(FallbackPolicy::new(Vec::new()).is_err());
    }
}
