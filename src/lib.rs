pub mod address;
pub mod api_server;
pub mod config;
mod error;
pub mod ip_info;
pub mod pipeline;
pub mod protocol;
pub mod proxy;
pub mod proxy_manager;
pub mod server_info;
pub mod socks5;
pub mod storage;

#[cfg(test)]
mod tests;

pub use self::{
    api_server::ApiServer,
    error::{Error, Result},
    pipeline::{Connector, Pipeline},
    proxy::{Proxy, ProxyCredentials},
    proxy_manager::ProxyManager,
};
