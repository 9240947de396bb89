use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Notification kinds the server is known to send, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kind {
    /// Two users liked each other
    Match {
        match_id: String,
        user_id: String,
        #[serde(default)]
        name: Option<String>,
    },
    Message {
        conversation_id: String,
        sender_id: String,
        #[serde(default)]
        preview: Option<String>,
    },
    Like {
        user_id: String,
        #[serde(default)]
        super_like: bool,
    },
    ProfileView {
        user_id: String,
    },
    /// Outcome of a subscription payment
    Payment {
        payment_id: String,
        status: String,
    },
}

/// A notification body as received over the channel.
///
/// The body is always kept verbatim, including fields no [`Kind`] knows
/// about. Bodies that match a known kind also carry the decoded view.
/// Serializes back to exactly what the server sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    raw: Value,
    kind: Option<Kind>,
}

impl Payload {
    pub fn decode(value: Value) -> Self {
        let kind = match Kind::deserialize(&value) {
            Ok(kind) => Some(kind),
            Err(err) => {
                log::debug!("[notifications] Keeping unrecognised payload as-is: {err}");
                None
            }
        };
        Self { raw: value, kind }
    }

    pub fn kind(&self) -> Option<&Kind> {
        self.kind.as_ref()
    }

    /// The body exactly as received
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// One-line human readable description
    pub fn summary(&self) -> String {
        match &self.kind {
            Some(Kind::Match { name: Some(name), .. }) => format!("It's a match with {name}!"),
            Some(Kind::Match { user_id, .. }) => format!("It's a match with {user_id}!"),
            Some(Kind::Message {
                sender_id,
                preview: Some(preview),
                ..
            }) => format!("{sender_id}: {preview}"),
            Some(Kind::Message { sender_id, .. }) => format!("New message from {sender_id}"),
            Some(Kind::Like { user_id, super_like: true }) => format!("{user_id} super liked you"),
            Some(Kind::Like { user_id, .. }) => format!("{user_id} liked you"),
            Some(Kind::ProfileView { user_id }) => format!("{user_id} viewed your profile"),
            Some(Kind::Payment { payment_id, status }) => format!("Payment {payment_id} {status}"),
            None => match self.raw.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => self.raw.to_string(),
            },
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::decode(value)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::decode)
    }
}
