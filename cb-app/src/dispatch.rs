//! Normal-turn source selection.

use crate::fallback::{FallbackPolicy, KindProfile, Reply};
use crate::random::RandomSource;
use cb_sources::{ContentKind, ContentSource};

/// `draw > 0.5` picks a fact; anything else, 0.5 included, picks a question.
pub fn choose_kind(draw: f64) -> ContentKind {
    if draw > 0.5 {
        ContentKind::Fact
    } else {
        ContentKind::Question
    }
}

pub struct Dispatcher {
    fact: Box<dyn ContentSource>,
    fact_profile: KindProfile,
    question: Box<dyn ContentSource>,
    question_profile: KindProfile,
}

impl Dispatcher {
    pub fn new(
        fact: Box<dyn ContentSource>,
        fact_profile: KindProfile,
        question: Box<dyn ContentSource>,
        question_profile: KindProfile,
    ) -> Self {
        Self {
            fact,
            fact_profile,
            question,
            question_profile,
        }
    }

    /// Pick fact or question and draw through the fallback policy. A failed
    /// kind yields its own fallback; the other kind is never tried instead.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn choose_and_fetch(
        &self,
        policy: &FallbackPolicy,
        rng: &mut dyn RandomSource,
    ) -> Reply {
        let kind = choose_kind(rng.next_f64());
        let (source, profile) = match kind {
            ContentKind::Fact => (self.fact.as_ref(), &self.fact_profile),
            _ => (self.question.as_ref(), &self.question_profile),
        };
        tracing::debug!(%kind, mode = source.mode(), "dispatching normal turn");
        policy.resolve(source, profile, rng).await
    }
}
