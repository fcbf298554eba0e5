//! Chatterbox configuration loader.
//!
//! Every section has defaults, so an empty (or missing) file yields a working
//! bank-backed setup against the public APIs.

use anyhow::Result;
use cb_sources::{ContentKind, Upstream};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatterboxConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_threshold_min")]
    pub threshold_min: u32,
    #[serde(default = "default_threshold_max")]
    pub threshold_max: u32,
    /// Delay between a bot message and its source caption.
    #[serde(default = "default_caption_delay_ms")]
    pub caption_delay_ms: u64,
    #[serde(default = "default_disabled_placeholder")]
    pub disabled_placeholder: String,
}

fn default_threshold_min() -> u32 {
    4
}

fn default_threshold_max() -> u32 {
    6
}

fn default_caption_delay_ms() -> u64 {
    600
}

fn default_disabled_placeholder() -> String {
    "Session terminated. Try again later.".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            threshold_min: default_threshold_min(),
            threshold_max: default_threshold_max(),
            caption_delay_ms: default_caption_delay_ms(),
            disabled_placeholder: default_disabled_placeholder(),
        }
    }
}

impl SessionConfig {
    pub fn caption_delay(&self) -> Duration {
        Duration::from_millis(self.caption_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Prefetched batch only; falls back once drained.
    #[default]
    Bank,
    /// One request per turn.
    Live,
    /// Prefetched batch, then live requests.
    Layered,
}

impl SourceMode {
    pub fn uses_bank(&self) -> bool {
        matches!(self, Self::Bank | Self::Layered)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub fact: ContentSourceConfig,
    #[serde(default)]
    pub question: ContentSourceConfig,
    #[serde(default)]
    pub excuse: ContentSourceConfig,
}

/// Per-kind source settings. Unset fields take the kind's defaults, see
/// [`SourcesConfig::resolve`].
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSourceConfig {
    #[serde(default)]
    pub mode: SourceMode,
    #[serde(default)]
    pub upstream: Option<Upstream>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

fn default_batch_size() -> usize {
    10
}

impl Default for ContentSourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            upstream: None,
            base_url: None,
            batch_size: default_batch_size(),
            fallback: None,
            caption: None,
        }
    }
}

/// Source settings with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub kind: ContentKind,
    pub mode: SourceMode,
    pub upstream: Upstream,
    pub base_url: Option<String>,
    pub batch_size: usize,
    pub fallback: String,
    /// Fixed caption label; questions caption with their category instead.
    pub caption: String,
}

pub const FACT_FALLBACK: &str = "My cat-fact-retriever is napping. Here's one: Cats are liquid.";
pub const QUESTION_FALLBACK: &str =
    "My question-generator is on strike. Is a hotdog a sandwich? Debate.";
pub const EXCUSE_FALLBACK: &str =
    "SESSION TERMINATED. I have to go... leverage my core competencies. Goodbye.";

impl SourcesConfig {
    pub fn resolve(&self, kind: ContentKind) -> ResolvedSource {
        let (raw, upstream, fallback, caption) = match kind {
            ContentKind::Fact => (&self.fact, Upstream::CatFact, FACT_FALLBACK, "The Cat's Meow"),
            ContentKind::Question => (&self.question, Upstream::OpenTdb, QUESTION_FALLBACK, ""),
            ContentKind::Excuse => (
                &self.excuse,
                Upstream::CorporateBs,
                EXCUSE_FALLBACK,
                "My Corporate Synergy Memo",
            ),
        };
        // Termination is always a single live request.
        let mode = match kind {
            ContentKind::Excuse => SourceMode::Live,
            _ => raw.mode,
        };
        ResolvedSource {
            kind,
            mode,
            upstream: raw.upstream.unwrap_or(upstream),
            base_url: raw
                .base_url
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned),
            batch_size: raw.batch_size,
            fallback: raw
                .fallback
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
            caption: raw.caption.clone().unwrap_or_else(|| caption.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_decorative_links")]
    pub decorative: Vec<String>,
}

fn default_decorative_links() -> Vec<String> {
    [
        "https://pointerpointer.com/",
        "https://cat-bounce.com/",
        "https://longdogechallenge.com/",
        "https://checkboxrace.com/",
        "https://pixelsfighting.com/",
        "https://puginarug.com/",
    ]
    .into_iter()
    .map(ToOwned::to_owned)
    .collect()
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            decorative: default_decorative_links(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_http_timeout_seconds() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout_seconds(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl ChatterboxConfig {
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        Ok(Self::load_with_path(path).await?.0)
    }

    /// An explicit path must exist; the default path may be absent, in which
    /// case built-in defaults apply.
    pub async fn load_with_path(path: Option<PathBuf>) -> Result<(Self, PathBuf)> {
        let explicit = path.is_some();
        let path = match path {
            Some(path) => path,
            None => default_config_path()?,
        };

        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::from_toml_str(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file; using defaults");
                Self::default()
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok((cfg, path))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `CHATTERBOX_*` overrides read through `lookup`. Blank URLs and
    /// unparsable ports are ignored.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CHATTERBOX_PORT") {
            match v.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!(%e, value = %v, "ignoring invalid CHATTERBOX_PORT"),
            }
        }
        let urls = [
            ("CHATTERBOX_FACT_URL", &mut self.sources.fact),
            ("CHATTERBOX_QUESTION_URL", &mut self.sources.question),
            ("CHATTERBOX_EXCUSE_URL", &mut self.sources.excuse),
        ];
        for (key, source) in urls {
            if let Some(v) = lookup(key).filter(|v| !v.trim().is_empty()) {
                source.base_url = Some(v);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.threshold_min == 0 {
            return Err(anyhow::anyhow!("session.threshold_min must be > 0"));
        }
        if self.session.threshold_min > self.session.threshold_max {
            return Err(anyhow::anyhow!(
                "session.threshold_min ({}) must be <= session.threshold_max ({})",
                self.session.threshold_min,
                self.session.threshold_max
            ));
        }
        if self.links.decorative.iter().all(|l| l.trim().is_empty()) {
            return Err(anyhow::anyhow!("links.decorative must not be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server.port must be > 0"));
        }
        if self.http.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("http.timeout_seconds must be > 0"));
        }
        for kind in [ContentKind::Fact, ContentKind::Question, ContentKind::Excuse] {
            let resolved = self.sources.resolve(kind);
            if resolved.upstream.kind() != kind {
                return Err(anyhow::anyhow!(
                    "sources.{kind}.upstream {:?} serves {} content",
                    resolved.upstream,
                    resolved.upstream.kind()
                ));
            }
            if resolved.mode.uses_bank() && resolved.batch_size == 0 {
                return Err(anyhow::anyhow!("sources.{kind}.batch_size must be > 0"));
            }
            if let Some(url) = resolved.base_url.as_deref() {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(anyhow::anyhow!(
                        "sources.{kind}.base_url must be http(s): {url}"
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn decorative_links(&self) -> Vec<String> {
        self.links
            .decorative
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
    Ok(Path::new(&home).join(".chatterbox").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_to_bank_backed_defaults() {
        let cfg = ChatterboxConfig::from_toml_str("").expect("parse");
        cfg.validate().expect("valid");

        assert_eq!(cfg.session.threshold_min, 4);
        assert_eq!(cfg.session.threshold_max, 6);
        assert_eq!(cfg.session.caption_delay(), Duration::from_millis(600));
        assert_eq!(cfg.decorative_links().len(), 6);

        let fact = cfg.sources.resolve(ContentKind::Fact);
        assert_eq!(fact.mode, SourceMode::Bank);
        assert_eq!(fact.upstream, Upstream::CatFact);
        assert_eq!(fact.batch_size, 10);
        assert_eq!(fact.fallback, FACT_FALLBACK);
        assert_eq!(fact.caption, "The Cat's Meow");

        let excuse = cfg.sources.resolve(ContentKind::Excuse);
        assert_eq!(excuse.mode, SourceMode::Live);
        assert_eq!(excuse.upstream, Upstream::CorporateBs);
    }

    #[test]
    fn per_kind_overrides_keep_other_defaults() {
        let cfg = ChatterboxConfig::from_toml_str(
            r#"
[session]
threshold_min = 2
threshold_max = 2

[sources.question]
mode = "layered"
base_url = "http://127.0.0.1:8081/"
fallback = "No questions today."

[sources.excuse]
upstream = "bored"
mode = "bank"
"#,
        )
        .expect("parse");
        cfg.validate().expect("valid");

        let question = cfg.sources.resolve(ContentKind::Question);
        assert_eq!(question.mode, SourceMode::Layered);
        assert_eq!(question.upstream, Upstream::OpenTdb);
        assert_eq!(question.base_url.as_deref(), Some("http://127.0.0.1:8081/"));
        assert_eq!(question.fallback, "No questions today.");

        let excuse = cfg.sources.resolve(ContentKind::Excuse);
        assert_eq!(excuse.upstream, Upstream::Bored);
        assert_eq!(excuse.mode, SourceMode::Live, "termination is never banked");
    }

    #[test]
    fn validation_rejects_inverted_range_and_mismatched_upstream() {
        let cfg = ChatterboxConfig::from_toml_str(
            "[session]\nthreshold_min = 7\nthreshold_max = 6\n",
        )
        .expect("parse");
        assert!(cfg.validate().is_err());

        let cfg = ChatterboxConfig::from_toml_str("[sources.fact]\nupstream = \"opentdb\"\n")
            .expect("parse");
        let err = cfg.validate().expect_err("question upstream in fact slot");
        assert!(err.to_string().contains("sources.fact.upstream"), "{err}");

        let cfg = ChatterboxConfig::from_toml_str("[links]\ndecorative = []\n").expect("parse");
        assert!(cfg.validate().is_err());

        let cfg = ChatterboxConfig::from_toml_str("[sources.fact]\nbase_url = \"ftp://cats\"\n")
            .expect("parse");
        assert!(cfg.validate().is_err());
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_replace_port_and_source_urls() {
        let mut cfg = ChatterboxConfig::default();
        cfg.apply_overrides_from(env(&[
            ("CHATTERBOX_PORT", " 4040 "),
            ("CHATTERBOX_FACT_URL", "http://127.0.0.1:7001"),
            ("CHATTERBOX_QUESTION_URL", "http://127.0.0.1:7002"),
            ("CHATTERBOX_EXCUSE_URL", "http://127.0.0.1:7003"),
        ]));

        assert_eq!(cfg.server.port, 4040);
        assert_eq!(
            cfg.sources.resolve(ContentKind::Fact).base_url.as_deref(),
            Some("http://127.0.0.1:7001")
        );
        assert_eq!(
            cfg.sources.resolve(ContentKind::Question).base_url.as_deref(),
            Some("http://127.0.0.1:7002")
        );
        assert_eq!(
            cfg.sources.resolve(ContentKind::Excuse).base_url.as_deref(),
            Some("http://127.0.0.1:7003")
        );
        cfg.validate().expect("valid");
    }

    #[test]
    fn blank_urls_and_bad_ports_are_ignored() {
        let mut cfg = ChatterboxConfig::from_toml_str(
            "[sources.fact]\nbase_url = \"http://127.0.0.1:8000\"\n",
        )
        .expect("parse");
        cfg.apply_overrides_from(env(&[
            ("CHATTERBOX_PORT", "not-a-port"),
            ("CHATTERBOX_FACT_URL", "   "),
            ("CHATTERBOX_QUESTION_URL", ""),
        ]));

        assert_eq!(cfg.server.port, 3030);
        assert_eq!(
            cfg.sources.fact.base_url.as_deref(),
            Some("http://127.0.0.1:8000")
        );
        assert_eq!(cfg.sources.question.base_url, None);

        cfg.apply_overrides_from(env(&[("CHATTERBOX_PORT", "70000")]));
        assert_eq!(cfg.server.port, 3030, "out of range for u16");
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        assert!(ChatterboxConfig::from_toml_str("[sources.fact]\nmode = \"psychic\"\n").is_err());
    }

    #[tokio::test]
    async fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert!(ChatterboxConfig::load(Some(missing)).await.is_err());

        let present = dir.path().join("config.toml");
        tokio::fs::write(&present, "[server]\nport = 4040\n")
            .await
            .expect("write config");
        let (cfg, path) = ChatterboxConfig::load_with_path(Some(present.clone()))
            .await
            .expect("load");
        assert_eq!(path, present);
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }
}
