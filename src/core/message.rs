//! Conversation Message Union
//!
//! Information Hiding:
//! - Backend message shapes are kept as raw JSON objects
//! - Unknown fields survive a fetch/append cycle untouched
//! - Callers see a closed set of roles plus typed accessors

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Role discriminator of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
    Tool,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Developer => "developer",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Function => "function",
        }
    }

    fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Role::System),
            "developer" => Some(Role::Developer),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "tool" => Some(Role::Tool),
            "function" => Some(Role::Function),
            _ => None,
        }
    }

    /// Fields a message of this role must carry.
    fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Role::System | Role::Developer | Role::User => &["content"],
            // assistant content may be null when tool_calls are present
            Role::Assistant => &[],
            Role::Tool => &["content", "tool_call_id"],
            Role::Function => &["content", "name"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of a message other than `role`, exactly as the backend sent them.
pub type MessageBody = Map<String, Value>;

/// One turn of a conversation.
///
/// The variant records the role; the body holds every other field verbatim,
/// so serializing a parsed message reproduces the original object.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    System(MessageBody),
    Developer(MessageBody),
    User(MessageBody),
    Assistant(MessageBody),
    Tool(MessageBody),
    Function(MessageBody),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System(text_body(content))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User(text_body(content))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant(text_body(content))
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut body = text_body(content);
        body.insert("tool_call_id".to_string(), Value::String(tool_call_id.into()));
        Message::Tool(body)
    }

    /// Build a message from a role and a raw body, validating required fields.
    pub fn from_parts(role: Role, body: MessageBody) -> Result<Self, String> {
        if body.contains_key("role") {
            return Err("message body must not carry its own `role`".to_string());
        }
        for field in role.required_fields() {
            if !body.contains_key(*field) {
                return Err(format!("{} message is missing field `{}`", role, field));
            }
        }
        if role == Role::Assistant
            && !body.contains_key("content")
            && !body.contains_key("tool_calls")
            && !body.contains_key("function_call")
        {
            return Err("assistant message needs content or tool_calls".to_string());
        }

        Ok(match role {
            Role::System => Message::System(body),
            Role::Developer => Message::Developer(body),
            Role::User => Message::User(body),
            Role::Assistant => Message::Assistant(body),
            Role::Tool => Message::Tool(body),
            Role::Function => Message::Function(body),
        })
    }

    /// Parse a single raw JSON payload.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut body) = value else {
            return Err("message must be a JSON object".to_string());
        };
        let role = match body.remove("role") {
            Some(Value::String(role)) => role,
            Some(_) => return Err("`role` must be a string".to_string()),
            None => return Err("message is missing field `role`".to_string()),
        };
        let role = Role::parse(&role).ok_or_else(|| format!("unknown role `{}`", role))?;
        Self::from_parts(role, body)
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System(_) => Role::System,
            Message::Developer(_) => Role::Developer,
            Message::User(_) => Role::User,
            Message::Assistant(_) => Role::Assistant,
            Message::Tool(_) => Role::Tool,
            Message::Function(_) => Role::Function,
        }
    }

    pub fn body(&self) -> &MessageBody {
        match self {
            Message::System(body)
            | Message::Developer(body)
            | Message::User(body)
            | Message::Assistant(body)
            | Message::Tool(body)
            | Message::Function(body) => body,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body().get(field)
    }

    /// Text of the message. Array content is flattened from its `text` parts.
    pub fn content_text(&self) -> Option<String> {
        match self.get("content")? {
            Value::String(text) => Some(text.clone()),
            Value::Array(parts) => {
                let text: Vec<&str> = parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect();
                Some(text.join(""))
            }
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.get("tool_call_id").and_then(Value::as_str)
    }
}

fn text_body(content: impl Into<String>) -> MessageBody {
    let mut body = Map::new();
    body.insert("content".to_string(), Value::String(content.into()));
    body
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // the variant is the only source of the role
        let fields: Vec<_> = self
            .body()
            .iter()
            .filter(|(key, _)| key.as_str() != "role")
            .collect();
        let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
        map.serialize_entry("role", self.role().as_str())?;
        for (key, value) in fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Message::from_value(value).map_err(de::Error::custom)
    }
}
