use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Fact,
    Question,
    Excuse,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Question => "question",
            Self::Excuse => "excuse",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Termination payloads differ by upstream: some return a ready-made phrase,
/// others an activity with its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcusePayload {
    Phrase { phrase: String },
    Activity { activity: String, activity_type: String },
}

/// One unit of content. Text fields are already entity-decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Fact { text: String },
    Question { text: String, category: String },
    Excuse(ExcusePayload),
}

impl Item {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Fact { .. } => ContentKind::Fact,
            Self::Question { .. } => ContentKind::Question,
            Self::Excuse(_) => ContentKind::Excuse,
        }
    }
}
