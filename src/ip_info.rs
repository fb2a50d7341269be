use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::proxy::Proxy;

const IP_INFO_URL: &str = "https://ipinfo.io/json";

/// What the geolocation service reports about the address we appear from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpInfo {
    pub ip: String,
    pub hostname: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub loc: Option<String>,
    pub org: Option<String>,
    pub postal: Option<String>,
    pub timezone: Option<String>,
    #[serde(default, skip_serializing)]
    pub readme: Option<String>,
}

#[async_trait]
pub trait IpInfoApi: Send + Sync {
    /// Looks the local address up again, as seen through `proxy` if one is given.
    async fn refresh_local_ip_info(&self, proxy: Option<Proxy>) -> Result<()>;
    fn local_ip_info(&self) -> Option<IpInfo>;
}

pub struct IpInfoClient {
    url: String,
    local: RwLock<Option<IpInfo>>,
}

impl Default for IpInfoClient {
    fn default() -> Self {
        IpInfoClient::new(IP_INFO_URL)
    }
}

impl IpInfoClient {
    pub fn new(url: impl Into<String>) -> Self {
        IpInfoClient {
            url: url.into(),
            local: RwLock::new(None),
        }
    }

    fn client(proxy: Option<&Proxy>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url(proxy)?)?);
        }
        Ok(builder.build()?)
    }
}

/// `socks5://[user:pass@]host:port`, credentials percent-encoded.
pub fn proxy_url(proxy: &Proxy) -> Result<Url> {
    let host = if proxy.host.contains(':') && !proxy.host.starts_with('[') {
        format!("[{}]", proxy.host)
    } else {
        proxy.host.clone()
    };
    let mut url = Url::parse(&format!("socks5://{}:{}", host, proxy.port))
        .with_context(|| format!("invalid proxy address {}:{}", proxy.host, proxy.port))?;
    if let Some(credentials) = &proxy.credentials {
        url.set_username(&credentials.username)
            .map_err(|_| anyhow::anyhow!("cannot set proxy username"))?;
        url.set_password(Some(&credentials.password))
            .map_err(|_| anyhow::anyhow!("cannot set proxy password"))?;
    }
    Ok(url)
}

#[async_trait]
impl IpInfoApi for IpInfoClient {
    async fn refresh_local_ip_info(&self, proxy: Option<Proxy>) -> Result<()> {
        let info: IpInfo = Self::client(proxy.as_ref())?
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decode ip info")?;
        tracing::debug!("local ip info: {:?}", info);
        *self.local.write() = Some(info);
        Ok(())
    }

    fn local_ip_info(&self) -> Option<IpInfo> {
        self.local.read().clone()
    }
}
