use crate::error::{Result, SourceError};
use crate::html::decode_entities;
use crate::types::{ContentKind, ExcusePayload, Item};
use serde::{Deserialize, Serialize};

/// Remote content APIs Chatterbox knows how to read.
///
/// Each upstream owns its URL layout and response shape; callers only see
/// [`Item`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    /// catfact.ninja: `/fact` and `/facts?limit=N`.
    #[serde(rename = "catfact")]
    CatFact,
    /// Open Trivia DB: `/api.php?amount=N`.
    #[serde(rename = "opentdb")]
    OpenTdb,
    /// Corporate BS generator: a single `phrase` per request.
    CorporateBs,
    /// Bored API: an `activity` with its `type`.
    Bored,
}

impl Upstream {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::CatFact => ContentKind::Fact,
            Self::OpenTdb => ContentKind::Question,
            Self::CorporateBs | Self::Bored => ContentKind::Excuse,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::CatFact => "https://catfact.ninja",
            Self::OpenTdb => "https://opentdb.com",
            Self::CorporateBs => "https://corporatebs-generator.sameerkumar.website",
            Self::Bored => "https://www.boredapi.com",
        }
    }

    pub fn single_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::CatFact => format!("{base}/fact"),
            Self::OpenTdb => format!("{base}/api.php?amount=1"),
            Self::CorporateBs => format!("{base}/"),
            Self::Bored => format!("{base}/api/activity"),
        }
    }

    /// `None` for upstreams that only serve one item per request.
    pub fn batch_url(&self, base_url: &str, amount: usize) -> Option<String> {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::CatFact => Some(format!("{base}/facts?limit={amount}")),
            Self::OpenTdb => Some(format!("{base}/api.php?amount={amount}")),
            Self::CorporateBs | Self::Bored => None,
        }
    }

    pub fn parse_single(&self, body: &str) -> Result<Item> {
        match self {
            Self::CatFact => {
                let parsed: CatFact = serde_json::from_str(body)?;
                parsed.try_into()
            }
            Self::OpenTdb => {
                let parsed: OpenTdbResponse = serde_json::from_str(body)?;
                parsed
                    .into_items()?
                    .pop()
                    .ok_or_else(|| SourceError::MalformedResponse("opentdb results empty".into()))?
            }
            Self::CorporateBs => {
                let parsed: CorporateBsResponse = serde_json::from_str(body)?;
                parsed.try_into()
            }
            Self::Bored => {
                let parsed: BoredResponse = serde_json::from_str(body)?;
                parsed.try_into()
            }
        }
    }

    pub fn parse_batch(&self, body: &str) -> Result<Vec<Item>> {
        match self {
            Self::CatFact => {
                let parsed: CatFactPage = serde_json::from_str(body)?;
                usable_items(*self, parsed.data.into_iter().map(Item::try_from))
            }
            Self::OpenTdb => {
                let parsed: OpenTdbResponse = serde_json::from_str(body)?;
                usable_items(*self, parsed.into_items()?)
            }
            Self::CorporateBs | Self::Bored => Err(SourceError::InvalidConfig(format!(
                "{self:?} has no batch endpoint"
            ))),
        }
    }
}

/// Keep the well-formed items of a batch. One bad entry costs only itself;
/// the batch fails only when entries came back and none were usable.
fn usable_items(
    upstream: Upstream,
    items: impl IntoIterator<Item = Result<Item>>,
) -> Result<Vec<Item>> {
    let mut usable = Vec::new();
    let mut skipped = 0usize;
    let mut last_error = None;
    for item in items {
        match item {
            Ok(item) => usable.push(item),
            Err(e) => {
                tracing::debug!(?upstream, error = %e, "skipping malformed batch item");
                skipped += 1;
                last_error = Some(e);
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(?upstream, skipped, kept = usable.len(), "batch had malformed items");
    }
    match last_error {
        Some(e) if usable.is_empty() => Err(e),
        _ => Ok(usable),
    }
}

fn require_text(value: Option<String>, field: &str) -> Result<String> {
    let Some(value) = value else {
        return Err(SourceError::MalformedResponse(format!("missing field: {field}")));
    };
    let decoded = decode_entities(value.trim()).into_owned();
    if decoded.is_empty() {
        return Err(SourceError::MalformedResponse(format!("empty field: {field}")));
    }
    Ok(decoded)
}

#[derive(Debug, Deserialize)]
struct CatFact {
    fact: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatFactPage {
    data: Vec<CatFact>,
}

impl TryFrom<CatFact> for Item {
    type Error = SourceError;

    fn try_from(value: CatFact) -> Result<Self> {
        Ok(Item::Fact {
            text: require_text(value.fact, "fact")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OpenTdbResponse {
    response_code: i64,
    #[serde(default)]
    results: Vec<OpenTdbQuestion>,
}

#[derive(Debug, Deserialize)]
struct OpenTdbQuestion {
    question: Option<String>,
    category: Option<String>,
}

impl OpenTdbResponse {
    fn into_items(self) -> Result<Vec<Result<Item>>> {
        // 0 is success; everything else (no results, rate limit, bad token) is unusable.
        if self.response_code != 0 {
            return Err(SourceError::MalformedResponse(format!(
                "opentdb response_code={}",
                self.response_code
            )));
        }
        Ok(self
            .results
            .into_iter()
            .map(|q| {
                Ok(Item::Question {
                    text: require_text(q.question, "question")?,
                    category: require_text(q.category, "category")?,
                })
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CorporateBsResponse {
    phrase: Option<String>,
}

impl TryFrom<CorporateBsResponse> for Item {
    type Error = SourceError;

    fn try_from(value: CorporateBsResponse) -> Result<Self> {
        Ok(Item::Excuse(ExcusePayload::Phrase {
            phrase: require_text(value.phrase, "phrase")?,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct BoredResponse {
    activity: Option<String>,
    #[serde(rename = "type")]
    activity_type: Option<String>,
}

impl TryFrom<BoredResponse> for Item {
    type Error = SourceError;

    fn try_from(value: BoredResponse) -> Result<Self> {
        Ok(Item::Excuse(ExcusePayload::Activity {
            activity: require_text(value.activity, "activity")?,
            activity_type: require_text(value.activity_type, "type")?,
        }))
    }
}
