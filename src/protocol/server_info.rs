use base64::{engine::general_purpose::STANDARD, Engine};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::server_info::{Players, ServerInfo};

impl Serialize for ServerInfo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("address", &self.address)?;
        map.serialize_entry("online", &self.online)?;
        map.serialize_entry("playerList", &self.player_list_summary)?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry("playerCountLabel", &self.player_count_label)?;
        map.serialize_entry("version", &self.version)?;
        map.serialize_entry("protocolVersion", &self.protocol_version)?;
        map.serialize_entry("players", &PlayerCount(self.players.as_ref()))?;
        if let Some(favicon) = &self.favicon {
            map.serialize_entry("icon", &STANDARD.encode(favicon))?;
        }
        map.end()
    }
}

/// Always an object; both counts become null when the server never answered.
struct PlayerCount<'a>(Option<&'a Players>);

impl Serialize for PlayerCount<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("max", &self.0.map(|p| p.max))?;
        map.serialize_entry("online", &self.0.map(|p| p.online))?;
        map.end()
    }
}
