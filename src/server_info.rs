use serde::Serialize;

/// A chat component as shown in server listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Text {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<Text>,
}

impl Text {
    pub fn literal(text: impl Into<String>) -> Self {
        Text {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn colored(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn append(mut self, text: Text) -> Self {
        self.extra.push(text);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Players {
    pub max: i32,
    pub online: i32,
}

/// A multiplayer server entry together with its last ping result.
/// Encoded for the control channel by [`crate::protocol`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub address: String,
    pub online: bool,
    pub player_list_summary: Vec<Text>,
    pub label: Text,
    pub player_count_label: Text,
    pub version: Text,
    pub protocol_version: i32,
    pub players: Option<Players>,
    pub favicon: Option<Vec<u8>>,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        ServerInfo {
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }
}
