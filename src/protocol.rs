//! JSON encoding for the control channel.
//!
//! Every type crossing the channel carries its own `Serialize` impl, so the
//! encoding is fixed at build time and shared by all callers. Fields that
//! must stay local are marked `#[serde(skip_serializing)]`; this holds at
//! any nesting depth since each nested type applies its own attributes.

use serde::Serialize;

use crate::Result;

pub use self::configurable::ProtocolConfigurable;

mod configurable;
mod server_info;

pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
