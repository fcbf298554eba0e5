//! End-of-session excuse and input shutdown.

use crate::fallback::{FallbackPolicy, KindProfile, Reply};
use crate::random::RandomSource;
use crate::schedule::Scheduler;
use anyhow::Result;
use cb_channels::PresentationSink;
use cb_sources::{ContentSource, ExcusePayload};
use std::time::Duration;

pub fn sign_off_text(payload: &ExcusePayload) -> String {
    match payload {
        ExcusePayload::Phrase { phrase } => {
            format!("SESSION TERMINATED. I must attend to a critical task: {phrase}.")
        }
        ExcusePayload::Activity {
            activity,
            activity_type,
        } => format!(
            "SESSION TERMINATED. Something urgent came up: {activity} ({activity_type}). Goodbye."
        ),
    }
}

pub struct TerminationHandler {
    source: Box<dyn ContentSource>,
    profile: KindProfile,
    placeholder: String,
}

impl TerminationHandler {
    pub fn new(source: Box<dyn ContentSource>, profile: KindProfile, placeholder: String) -> Self {
        Self {
            source,
            profile,
            placeholder,
        }
    }

    /// Render one sign-off (remote excuse or the fixed literal), then disable
    /// input. Input is disabled even when rendering the sign-off fails.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn terminate(
        &self,
        policy: &FallbackPolicy,
        rng: &mut dyn RandomSource,
        sink: &dyn PresentationSink,
        scheduler: &mut Scheduler,
        caption_delay: Duration,
    ) -> Result<Reply> {
        let reply = policy.resolve(self.source.as_ref(), &self.profile, rng).await;
        let rendered = reply.render(sink, scheduler, caption_delay).await;
        let disabled = sink.disable_input(&self.placeholder).await;
        tracing::info!(fell_back = reply.fell_back(), "session terminated");
        rendered?;
        disabled?;
        Ok(reply)
    }
}
