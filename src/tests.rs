use std::{
    net::SocketAddr,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    io::{self, AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::Notify,
};

use crate::{
    address::Address,
    ip_info::{IpInfo, IpInfoApi},
    pipeline::{Next, Stage},
    proxy::Proxy,
    storage::{Storage, StorageItem},
    Result,
};

pub async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (tcp, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let (mut rx, mut tx) = io::split(tcp);
                io::copy(&mut rx, &mut tx).await.ok();
            });
        }
    });
    addr
}

pub async fn assert_echo(mut tcp: TcpStream) {
    const BUF: &[u8] = b"asdfasdfasdfasj12312313123";
    tcp.write_all(BUF).await.unwrap();

    let mut buf = [0u8; BUF.len()];
    tcp.read_exact(&mut buf).await.unwrap();

    assert_eq!(buf, BUF);
}

/// A stage that only forwards to the stages behind it.
pub struct Passthrough;

#[async_trait]
impl Stage for Passthrough {
    async fn connect(&self, target: &Address, next: Next<'_>) -> Result<TcpStream> {
        next.connect(target).await
    }
}

/// Records refresh requests instead of asking a real service.
#[derive(Default)]
pub struct FakeIpInfo {
    fail: bool,
    calls: AtomicUsize,
    last_proxy: Mutex<Option<Proxy>>,
    notify: Notify,
}

impl FakeIpInfo {
    pub fn failing() -> Self {
        FakeIpInfo {
            fail: true,
            ..Default::default()
        }
    }

    /// Waits until at least `n` refreshes happened, returns the count.
    pub async fn wait_calls(&self, n: usize) -> usize {
        loop {
            let notified = self.notify.notified();
            let calls = self.calls.load(Ordering::SeqCst);
            if calls >= n {
                return calls;
            }
            notified.await;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_proxy(&self) -> Option<Proxy> {
        self.last_proxy.lock().clone()
    }
}

#[async_trait]
impl IpInfoApi for FakeIpInfo {
    async fn refresh_local_ip_info(&self, proxy: Option<Proxy>) -> anyhow::Result<()> {
        *self.last_proxy.lock() = proxy;
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
        if self.fail {
            return Err(anyhow!("lookup failed"));
        }
        Ok(())
    }

    fn local_ip_info(&self) -> Option<IpInfo> {
        None
    }
}

/// Reads find nothing, writes always fail.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<StorageItem>> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: &str) -> anyhow::Result<()> {
        Err(anyhow!("disk full while writing {}", key))
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        Err(anyhow!("disk full while removing {}", key))
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}
