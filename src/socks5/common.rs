use std::{
    io::{Error, ErrorKind, Result},
    net::{Ipv4Addr, SocketAddr},
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::address::Address;

pub fn unspecified() -> Address {
    Address::SocketAddr(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0))
}

async fn read_port<R>(mut reader: R) -> Result<u16>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf).await?;
    Ok(u16::from_be_bytes(buf))
}

pub async fn write_address<W>(address: &Address, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(262);
    match address {
        Address::SocketAddr(SocketAddr::V4(addr)) => {
            buf.push(0x01);
            buf.extend_from_slice(&addr.ip().octets());
            buf.extend_from_slice(&addr.port().to_be_bytes());
        }
        Address::SocketAddr(SocketAddr::V6(addr)) => {
            buf.push(0x04);
            buf.extend_from_slice(&addr.ip().octets());
            buf.extend_from_slice(&addr.port().to_be_bytes());
        }
        Address::Domain(domain, port) => {
            if domain.len() >= 256 {
                return Err(ErrorKind::InvalidInput.into());
            }
            buf.push(0x03);
            buf.push(domain.len() as u8);
            buf.extend_from_slice(domain.as_bytes());
            buf.extend_from_slice(&port.to_be_bytes());
        }
    };
    writer.write_all(&buf).await
}

pub async fn read_address<R>(mut reader: R) -> Result<Address>
where
    R: AsyncRead + Unpin,
{
    let mut atyp = [0u8; 1];
    reader.read_exact(&mut atyp).await?;

    Ok(match atyp[0] {
        1 => {
            let mut ip = [0u8; 4];
            reader.read_exact(&mut ip).await?;
            Address::SocketAddr(SocketAddr::new(ip.into(), read_port(&mut reader).await?))
        }
        3 => {
            let mut len = [0u8; 1];
            reader.read_exact(&mut len).await?;
            let mut domain = vec![0u8; len[0] as usize];
            reader.read_exact(&mut domain).await?;

            let domain = String::from_utf8(domain).map_err(|e| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("bad domain {:?}", e.as_bytes()),
                )
            })?;

            Address::Domain(domain, read_port(&mut reader).await?)
        }
        4 => {
            let mut ip = [0u8; 16];
            reader.read_exact(&mut ip).await?;
            Address::SocketAddr(SocketAddr::new(ip.into(), read_port(&mut reader).await?))
        }
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("bad atyp {}", atyp[0]),
            ))
        }
    })
}
