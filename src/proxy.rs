use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Placeholder stored in the current slot while no proxy is selected.
pub const NO_PROXY: Proxy = Proxy {
    host: String::new(),
    port: 0,
    credentials: None,
};

/// A saved SOCKS5 proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub credentials: Option<ProxyCredentials>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

// Debug output ends up in logs, keep the password out.
impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Proxy {
    pub fn new(host: impl Into<String>, port: u16, credentials: Option<ProxyCredentials>) -> Self {
        Proxy {
            host: host.into(),
            port,
            credentials,
        }
    }

    /// A blank host never points at a real proxy, whatever the other fields say.
    pub fn is_blank(&self) -> bool {
        self.host.trim().is_empty()
    }

    pub fn address(&self) -> Address {
        Address::from_host_port(&self.host, self.port)
    }
}

impl ProxyCredentials {
    /// Credentials exist only when both fields are filled in.
    pub fn from_user_input(username: &str, password: &str) -> Option<ProxyCredentials> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return None;
        }
        Some(ProxyCredentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}
