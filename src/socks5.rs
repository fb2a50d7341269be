pub use self::protocol::Socks5Error;

use async_trait::async_trait;
use tokio::{
    io::{AsyncWriteExt, BufWriter},
    net::TcpStream,
};

use self::protocol::{
    AuthMethod, AuthRequest, AuthResponse, CommandRequest, PasswordRequest, PasswordResponse,
    Version,
};
use crate::{
    address::Address,
    pipeline::{Next, Stage},
    proxy::ProxyCredentials,
    Result,
};

mod common;
pub mod protocol;
#[cfg(test)]
mod tests;

/// Client side of a SOCKS5 proxy, placed in front of a pipeline.
///
/// The stage dials the proxy server through the stages behind it, then asks
/// the server to `CONNECT` to the real target.
#[derive(Debug, Clone)]
pub struct Socks5ProxyStage {
    server: Address,
    credentials: Option<ProxyCredentials>,
}

impl Socks5ProxyStage {
    pub fn new(server: Address) -> Self {
        Socks5ProxyStage {
            server,
            credentials: None,
        }
    }

    pub fn with_credentials(server: Address, credentials: ProxyCredentials) -> Self {
        Socks5ProxyStage {
            server,
            credentials: Some(credentials),
        }
    }

    pub fn server(&self) -> &Address {
        &self.server
    }

    fn methods(&self) -> Vec<AuthMethod> {
        match self.credentials {
            Some(_) => vec![AuthMethod::Noauth, AuthMethod::UsernamePassword],
            None => vec![AuthMethod::Noauth],
        }
    }

    async fn handshake(&self, socket: &mut TcpStream, target: &Address) -> Result<()> {
        let mut socket = BufWriter::with_capacity(512, socket);

        Version::V5.write(&mut socket).await?;
        AuthRequest::new(self.methods()).write(&mut socket).await?;
        socket.flush().await?;

        Version::read(&mut socket).await?;
        let method = AuthResponse::read(&mut socket).await?.method();
        tracing::trace!("socks5 server selected {:?}", method);
        match (method, &self.credentials) {
            (AuthMethod::Noauth, _) => {}
            (AuthMethod::UsernamePassword, Some(credentials)) => {
                PasswordRequest::new(&credentials.username, &credentials.password)
                    .write(&mut socket)
                    .await?;
                socket.flush().await?;

                let resp = PasswordResponse::read(&mut socket).await?;
                if resp.status() != 0 {
                    return Err(Socks5Error::AuthFailed(resp.status()).into());
                }
            }
            (AuthMethod::NoAcceptableMethod, _) => {
                return Err(Socks5Error::NoAcceptableMethod.into())
            }
            (other, _) => return Err(Socks5Error::UnexpectedMethod(other).into()),
        }

        CommandRequest::connect(target.clone())
            .write(&mut socket)
            .await?;
        socket.flush().await?;

        let resp = protocol::CommandResponse::read(&mut socket).await?;
        tracing::trace!("socks5 connected to {}, bound {}", target, resp.address);

        Ok(())
    }
}

#[async_trait]
impl Stage for Socks5ProxyStage {
    async fn connect(&self, target: &Address, next: Next<'_>) -> Result<TcpStream> {
        let mut socket = next.connect(&self.server).await?;
        self.handshake(&mut socket, target).await?;
        Ok(socket)
    }
}
