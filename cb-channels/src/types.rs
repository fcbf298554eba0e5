use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

id_newtype!(ConnectionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// Everything a sink can be asked to show, in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    Message { role: Role, content: String },
    Source { label: String, url: String },
    Typing { active: bool },
    InputDisabled { placeholder: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundMessageKind {
    /// A client connected; a fresh conversation should start.
    Opened,
    Message,
    /// The client went away; its conversation can be dropped.
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub kind: InboundMessageKind,
    pub connection_id: ConnectionId,
    #[serde(default)]
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(kind: InboundMessageKind, connection_id: ConnectionId, content: String) -> Self {
        Self {
            kind,
            connection_id,
            content,
            received_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_events_use_snake_case_type_tags() {
        let caption = RenderEvent::Source {
            label: "The Cat's Meow".to_string(),
            url: "https://cat-bounce.com/".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&caption).expect("serialize"),
            serde_json::json!({
                "type": "source",
                "label": "The Cat's Meow",
                "url": "https://cat-bounce.com/"
            })
        );

        let disabled = RenderEvent::InputDisabled {
            placeholder: "closed".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&disabled).expect("serialize")["type"],
            "input_disabled"
        );

        let message = RenderEvent::Message {
            role: Role::Bot,
            content: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&message).expect("serialize")["role"],
            "bot"
        );
    }
}
