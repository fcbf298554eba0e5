//! Builds content sources from resolved config.

use crate::config::{ResolvedSource, SourceMode};
use crate::fallback::KindProfile;
use anyhow::Result;
use cb_sources::{Bank, BankSource, ContentClient, ContentSource, LayeredSource, LiveSource};
use std::time::Duration;

/// A bank waiting for its one-shot batch fetch.
#[derive(Debug, Clone)]
pub struct PreloadJob {
    pub bank: Bank,
    pub client: ContentClient,
    pub amount: usize,
}

impl PreloadJob {
    pub async fn run(self) -> usize {
        self.bank.preload(&self.client, self.amount).await
    }
}

pub struct BuiltSource {
    pub source: Box<dyn ContentSource>,
    pub profile: KindProfile,
    pub preload: Option<PreloadJob>,
}

pub fn build_source(resolved: &ResolvedSource, timeout: Duration) -> Result<BuiltSource> {
    let client = ContentClient::new(resolved.upstream, resolved.base_url.as_deref(), timeout)?;
    let profile = KindProfile {
        kind: resolved.kind,
        fallback: resolved.fallback.clone(),
        caption: resolved.caption.clone(),
    };

    let (source, preload): (Box<dyn ContentSource>, Option<PreloadJob>) = match resolved.mode {
        SourceMode::Live => (Box::new(LiveSource::new(client)), None),
        SourceMode::Bank => {
            let bank = Bank::new(resolved.kind);
            let job = PreloadJob {
                bank: bank.clone(),
                client,
                amount: resolved.batch_size,
            };
            (Box::new(BankSource::new(bank)), Some(job))
        }
        SourceMode::Layered => {
            let bank = Bank::new(resolved.kind);
            let job = PreloadJob {
                bank: bank.clone(),
                client: client.clone(),
                amount: resolved.batch_size,
            };
            (Box::new(LayeredSource::new(bank, client)?), Some(job))
        }
    };

    tracing::debug!(
        kind = %resolved.kind,
        mode = source.mode(),
        upstream = ?resolved.upstream,
        preload = preload.is_some(),
        "content source built"
    );
    Ok(BuiltSource {
        source,
        profile,
        preload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatterboxConfig;
    use cb_sources::ContentKind;

    #[test]
    fn bank_modes_carry_a_preload_job_and_live_does_not() {
        let cfg = ChatterboxConfig::from_toml_str(
            r#"
[sources.fact]
mode = "live"

[sources.question]
mode = "layered"
batch_size = 3
"#,
        )
        .expect("parse");

        let fact = build_source(&cfg.sources.resolve(ContentKind::Fact), Duration::from_secs(1))
            .expect("fact");
        assert_eq!(fact.source.mode(), "live");
        assert!(fact.preload.is_none());

        let question = build_source(
            &cfg.sources.resolve(ContentKind::Question),
            Duration::from_secs(1),
        )
        .expect("question");
        assert_eq!(question.source.mode(), "layered");
        let job = question.preload.expect("layered preloads");
        assert_eq!(job.amount, 3);
        assert_eq!(job.bank.kind(), ContentKind::Question);
    }
}
