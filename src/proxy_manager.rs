use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    config::{Configurable, Setting, SettingValue},
    ip_info::IpInfoApi,
    pipeline::{Pipeline, PipelineHandler},
    proxy::{Proxy, ProxyCredentials, NO_PROXY},
    socks5::Socks5ProxyStage,
    storage::Storage,
    Error, Result,
};

/// Name of the stage installed into connection pipelines.
pub const PROXY_STAGE: &str = "proxy";
const STORAGE_KEY: &str = "proxy";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProxyState {
    #[serde(default)]
    proxy: Proxy,
    #[serde(default)]
    proxies: Vec<Proxy>,
}

struct Inner {
    state: RwLock<ProxyState>,
    storage: Arc<dyn Storage>,
    ip_info: Arc<dyn IpInfoApi>,
    // orders writes to storage
    store_lock: Mutex<()>,
}

/// Saved SOCKS5 proxies plus the one used for new connections.
///
/// Only SOCKS5 proxies are supported. Selecting a proxy copies it, so
/// editing or removing the saved entry later does not change an active
/// selection.
#[derive(Clone)]
pub struct ProxyManager {
    inner: Arc<Inner>,
}

impl ProxyManager {
    /// Restores the state persisted in `storage`, or starts empty.
    pub async fn load(storage: Arc<dyn Storage>, ip_info: Arc<dyn IpInfoApi>) -> Result<Self> {
        let state = match storage.get(STORAGE_KEY).await? {
            Some(item) => serde_json::from_str(&item.content)?,
            None => ProxyState::default(),
        };
        tracing::debug!(
            "loaded {} proxies, current: {:?}",
            state.proxies.len(),
            state.proxy
        );

        Ok(ProxyManager {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                storage,
                ip_info,
                store_lock: Mutex::new(()),
            }),
        })
    }

    /// The proxy used for new connections. `None` while unset.
    pub fn current_proxy(&self) -> Option<Proxy> {
        let state = self.inner.state.read();
        Some(state.proxy.clone()).filter(|p| !p.is_blank())
    }

    pub fn proxies(&self) -> Vec<Proxy> {
        self.inner.state.read().proxies.clone()
    }

    /// Saves a new proxy. Credentials are kept only when both username and
    /// password are non-blank; pass empty strings for a proxy without auth.
    pub async fn add_proxy(
        &self,
        host: impl Into<String>,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let proxy = Proxy::new(
            host,
            port,
            ProxyCredentials::from_user_input(username, password),
        );
        tracing::debug!("add proxy {}:{}", proxy.host, proxy.port);
        self.inner.state.write().proxies.push(proxy);
        self.store().await
    }

    pub async fn remove_proxy(&self, index: usize) -> Result<()> {
        {
            let mut state = self.inner.state.write();
            check_index(index, state.proxies.len())?;
            let removed = state.proxies.remove(index);
            tracing::debug!("remove proxy {}:{}", removed.host, removed.port);
        }
        self.store().await
    }

    pub async fn set_proxy(&self, index: usize) -> Result<()> {
        {
            let mut state = self.inner.state.write();
            check_index(index, state.proxies.len())?;
            state.proxy = state.proxies[index].clone();
            tracing::debug!("set proxy {}:{}", state.proxy.host, state.proxy.port);
        }
        self.sync().await
    }

    pub async fn unset_proxy(&self) -> Result<()> {
        self.inner.state.write().proxy = NO_PROXY;
        tracing::debug!("unset proxy");
        self.sync().await
    }

    /// Puts a SOCKS5 stage named [`PROXY_STAGE`] at the head of `pipeline`
    /// when a proxy is selected. Does nothing otherwise.
    pub fn insert_proxy_handler(&self, pipeline: &mut Pipeline) -> Result<()> {
        let proxy = match self.current_proxy() {
            Some(proxy) => proxy,
            None => return Ok(()),
        };
        let address = proxy.address();
        let stage = match proxy.credentials {
            Some(credentials) => Socks5ProxyStage::with_credentials(address, credentials),
            None => Socks5ProxyStage::new(address),
        };
        tracing::trace!("insert proxy stage {}", stage.server());
        pipeline.add_first(PROXY_STAGE, stage)
    }

    async fn store(&self) -> Result<()> {
        let _guard = self.inner.store_lock.lock().await;
        let content = serde_json::to_string(&*self.inner.state.read())?;
        self.inner.storage.set(STORAGE_KEY, &content).await?;
        Ok(())
    }

    async fn sync(&self) -> Result<()> {
        self.store().await?;
        self.refresh_ip_info();
        Ok(())
    }

    // Fire and forget: the selection stands even if the lookup fails.
    fn refresh_ip_info(&self) {
        let ip_info = self.inner.ip_info.clone();
        let proxy = self.current_proxy();
        tokio::spawn(async move {
            if let Err(e) = ip_info.refresh_local_ip_info(proxy).await {
                tracing::warn!("Failed to refresh local ip info: {:?}", e);
            }
        });
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(Error::IndexOutOfRange { index, len });
    }
    Ok(())
}

impl PipelineHandler for ProxyManager {
    fn on_pipeline(&self, pipeline: &mut Pipeline) -> Result<()> {
        self.insert_proxy_handler(pipeline)
    }
}

impl Configurable for ProxyManager {
    fn name(&self) -> &str {
        "proxy"
    }

    fn settings(&self) -> Vec<Setting> {
        let state = self.inner.state.read();
        vec![
            Setting::new("proxy", SettingValue::Proxy(state.proxy.clone()))
                .with_default(SettingValue::Proxy(NO_PROXY)),
            Setting::new("proxies", SettingValue::List(state.proxies.clone()))
                .with_default(SettingValue::List(Vec::new())),
        ]
    }
}
