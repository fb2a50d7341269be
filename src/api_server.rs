use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;

use crate::{ip_info::IpInfoApi, ProxyManager};

mod handlers;
mod routes;

/// Local HTTP control channel for the proxy registry.
pub struct ApiServer {
    pub proxy_manager: ProxyManager,
    pub ip_info: Arc<dyn IpInfoApi>,
    pub access_token: Option<String>,
}

impl ApiServer {
    pub async fn run(self, bind: &str) -> Result<SocketAddr> {
        let app = self.routes();

        let server = axum::Server::try_bind(&bind.parse()?)?.serve(app.into_make_service());
        let local_addr = server.local_addr();
        tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!("Api server error: {:?}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::MemoryCache, tests::FakeIpInfo};
    use serde_json::{json, Value};

    async fn serve(access_token: Option<&str>) -> SocketAddr {
        let ip_info = Arc::new(FakeIpInfo::default());
        let proxy_manager = ProxyManager::load(Arc::new(MemoryCache::new()), ip_info.clone())
            .await
            .unwrap();
        ApiServer {
            proxy_manager,
            ip_info,
            access_token: access_token.map(ToString::to_string),
        }
        .run("127.0.0.1:0")
        .await
        .unwrap()
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let addr = serve(None).await;
        let url = format!("http://{}/api/proxies", addr);

        let resp = client()
            .post(&url)
            .json(&json!({ "host": "10.0.0.1", "port": 1080, "username": "u", "password": "p" }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());

        let list: Value = client().get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(
            list,
            json!([{
                "host": "10.0.0.1",
                "port": 1080,
                "credentials": { "username": "u", "password": "p" }
            }])
        );

        let resp = client()
            .delete(format!("{}/7", url))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_access_token() {
        let addr = serve(Some("secret")).await;
        let url = format!("http://{}/api/proxy", addr);

        let resp = client().get(&url).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let resp = client()
            .get(&url)
            .header("Authorization", "secret")
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());

        let resp = client()
            .get(format!("{}?token=secret", url))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }
}
