use serde::ser::{Serialize, Serializer};

use crate::config::{Configurable, Setting};

/// Encodes a configurable as `{"name", "valueType": "CONFIGURABLE", "value": [...]}`.
pub struct ProtocolConfigurable<'a>(pub &'a dyn Configurable);

impl Serialize for ProtocolConfigurable<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Setting::from_configurable(self.0).serialize(serializer)
    }
}
