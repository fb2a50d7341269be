use std::{net::SocketAddr, sync::Arc};

use tokio::net::{TcpListener, TcpStream};

use super::*;
use crate::{
    pipeline::{Connector, Pipeline},
    proxy_manager::{ProxyManager, PROXY_STAGE},
    storage::MemoryCache,
    tests::{assert_echo, spawn_echo_server, FakeIpInfo},
    Error,
};
use super::protocol::{CommandResponse, Socks5Error};

async fn spawn_socks5_server(credentials: Option<(&'static str, &'static str)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                if let Err(e) = serve(socket, credentials).await {
                    println!("socks5 test server: {:?}", e);
                }
            });
        }
    });
    addr
}

async fn serve(mut socket: TcpStream, credentials: Option<(&str, &str)>) -> Result<()> {
    Version::read(&mut socket).await?;
    let req = AuthRequest::read(&mut socket).await?;
    let method = match credentials {
        Some(_) => req.select_from(&[AuthMethod::UsernamePassword]),
        None => req.select_from(&[AuthMethod::Noauth]),
    };
    Version::V5.write(&mut socket).await?;
    AuthResponse::new(method).write(&mut socket).await?;
    if method == AuthMethod::NoAcceptableMethod {
        return Ok(());
    }

    if let Some((username, password)) = credentials {
        let req = PasswordRequest::read(&mut socket).await?;
        if req.username != username || req.password != password {
            PasswordResponse::failure().write(&mut socket).await?;
            return Ok(());
        }
        PasswordResponse::success().write(&mut socket).await?;
    }

    let req = CommandRequest::read(&mut socket).await?;
    let mut upstream = TcpStream::connect(req.address.to_socket_addr()?).await?;
    CommandResponse::success(upstream.local_addr()?.into())
        .write(&mut socket)
        .await?;
    tokio::io::copy_bidirectional(&mut socket, &mut upstream).await?;
    Ok(())
}

async fn connect_via(stage: Socks5ProxyStage, target: SocketAddr) -> Result<TcpStream> {
    let mut pipeline = Pipeline::new();
    pipeline.add_first(PROXY_STAGE, stage)?;
    pipeline.connect(&target.into()).await
}

#[tokio::test]
async fn test_socks5_no_auth() {
    let echo = spawn_echo_server().await;
    let server = spawn_socks5_server(None).await;

    let stream = connect_via(Socks5ProxyStage::new(server.into()), echo)
        .await
        .unwrap();
    assert_echo(stream).await;
}

#[tokio::test]
async fn test_socks5_credentials_offered_but_not_required() {
    let echo = spawn_echo_server().await;
    let server = spawn_socks5_server(None).await;

    let credentials = ProxyCredentials::from_user_input("u", "p").unwrap();
    let stream = connect_via(
        Socks5ProxyStage::with_credentials(server.into(), credentials),
        echo,
    )
    .await
    .unwrap();
    assert_echo(stream).await;
}

#[tokio::test]
async fn test_socks5_username_password() {
    let echo = spawn_echo_server().await;
    let server = spawn_socks5_server(Some(("user", "secret"))).await;

    let credentials = ProxyCredentials::from_user_input("user", "secret").unwrap();
    let stream = connect_via(
        Socks5ProxyStage::with_credentials(server.into(), credentials),
        echo,
    )
    .await
    .unwrap();
    assert_echo(stream).await;
}

#[tokio::test]
async fn test_socks5_wrong_password() {
    let echo = spawn_echo_server().await;
    let server = spawn_socks5_server(Some(("user", "secret"))).await;

    let credentials = ProxyCredentials::from_user_input("user", "wrong").unwrap();
    let err = connect_via(
        Socks5ProxyStage::with_credentials(server.into(), credentials),
        echo,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Socks5(Socks5Error::AuthFailed(1))));
}

#[tokio::test]
async fn test_socks5_missing_credentials() {
    let echo = spawn_echo_server().await;
    let server = spawn_socks5_server(Some(("user", "secret"))).await;

    let err = connect_via(Socks5ProxyStage::new(server.into()), echo)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Socks5(Socks5Error::NoAcceptableMethod)));
}

#[tokio::test]
async fn test_connector_follows_selection() {
    let echo = spawn_echo_server().await;
    let server = spawn_socks5_server(Some(("user", "secret"))).await;

    let manager = ProxyManager::load(
        Arc::new(MemoryCache::new()),
        Arc::new(FakeIpInfo::default()),
    )
    .await
    .unwrap();
    let connector = Connector::new().with_handler(Arc::new(manager.clone()));

    assert!(connector.pipeline().unwrap().is_empty());
    assert_echo(connector.connect(&echo.into()).await.unwrap()).await;

    manager
        .add_proxy(server.ip().to_string(), server.port(), "user", "secret")
        .await
        .unwrap();
    manager.set_proxy(0).await.unwrap();
    assert_eq!(connector.pipeline().unwrap().names(), vec![PROXY_STAGE]);
    assert_echo(connector.connect(&echo.into()).await.unwrap()).await;

    manager.unset_proxy().await.unwrap();
    assert!(connector.pipeline().unwrap().is_empty());
}
