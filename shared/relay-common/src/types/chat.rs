//! Chat Types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Author of a conversation message.
///
/// Roles the relay does not know (`developer`, ...) are carried as
/// [`Role::Other`] and forwarded with their original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The human on the other end of the chat.
    User,
    /// Earlier model output.
    Assistant,
    /// Tool call result.
    Tool,
    /// Legacy function call result.
    Function,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Function => "function",
            Self::Other(role) => role,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "tool" => Self::Tool,
            "function" => Self::Function,
            _ => Self::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

/// One turn of a conversation.
///
/// Fields the relay does not interpret (`name`, `copilot_references`, ...)
/// are kept in `extra` and forwarded to the model untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationMessage {
    /// Create a message with no extra fields.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            extra: Map::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Inbound chat request sent by the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

/// Outbound request to an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ConversationMessage>,
    pub stream: bool,
}

/// Minimal streaming delta envelope:
/// `{"choices":[{"delta":{"content":"..."},"index":0}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaChunk {
    pub choices: Vec<DeltaChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaChoice {
    pub delta: Delta,
    pub index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    pub content: String,
}

impl DeltaChunk {
    /// Wrap a piece of text as the single choice of a delta chunk.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            choices: vec![DeltaChoice {
                delta: Delta {
                    content: text.into(),
                },
                index: 0,
            }],
        }
    }
}
