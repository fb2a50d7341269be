use serde::Serialize;

use crate::proxy::Proxy;

/// Something that exposes its options to the control surface.
pub trait Configurable {
    fn name(&self) -> &str;
    fn settings(&self) -> Vec<Setting>;
}

/// One named option of a [`Configurable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    pub name: String,
    #[serde(flatten)]
    pub value: SettingValue,
    #[serde(skip_serializing)]
    pub default: Option<SettingValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "valueType",
    content = "value",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum SettingValue {
    Boolean(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Proxy(Proxy),
    List(Vec<Proxy>),
    Configurable(Vec<Setting>),
}

impl Setting {
    pub fn new(name: impl Into<String>, value: SettingValue) -> Self {
        Setting {
            name: name.into(),
            value,
            default: None,
        }
    }

    pub fn with_default(mut self, default: SettingValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Nests a whole configurable as a single setting.
    pub fn from_configurable(configurable: &dyn Configurable) -> Self {
        Setting::new(
            configurable.name(),
            SettingValue::Configurable(configurable.settings()),
        )
    }
}
