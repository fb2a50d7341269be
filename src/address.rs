use std::{
    fmt,
    io::{Error, ErrorKind, Result},
    net::{IpAddr, SocketAddr},
};

/// Address can be a socket address or a domain with port.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Address {
    SocketAddr(SocketAddr),
    Domain(String, u16),
}

/// Converts to address value.
pub trait IntoAddress: Send {
    fn into_address(self) -> Result<Address>;
}

fn no_addr() -> Error {
    ErrorKind::AddrNotAvailable.into()
}

impl IntoAddress for &str {
    fn into_address(self) -> Result<Address> {
        if let Ok(addr) = self.parse::<SocketAddr>() {
            return Ok(addr.into());
        }
        let mut parts = self.rsplitn(2, ':');
        let port: u16 = parts
            .next()
            .ok_or_else(no_addr)?
            .parse()
            .map_err(|_| no_addr())?;
        let domain = parts.next().ok_or_else(no_addr)?;
        Ok(Address::from_host_port(domain, port))
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::SocketAddr(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::SocketAddr(s) => write!(f, "{}", s),
            Address::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl Address {
    /// IP literals become socket addresses, anything else is kept as a domain.
    /// Surrounding brackets are dropped, so `[::1]` works as an IPv6 host.
    pub fn from_host_port(host: &str, port: u16) -> Address {
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        match host.parse::<IpAddr>() {
            Ok(ip) => Address::SocketAddr(SocketAddr::new(ip, port)),
            Err(_) => Address::Domain(host.to_string(), port),
        }
    }

    /// Converts to SocketAddr if Address can be convert to.
    /// Otherwise [AddrNotAvailable](std::io::ErrorKind::AddrNotAvailable) is returned.
    pub fn to_socket_addr(&self) -> Result<SocketAddr> {
        match self {
            Address::SocketAddr(s) => Ok(*s),
            Address::Domain(..) => Err(no_addr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_host_port() {
        assert_eq!(
            Address::from_host_port("127.0.0.1", 1080),
            Address::SocketAddr("127.0.0.1:1080".parse().unwrap())
        );
        assert_eq!(
            Address::from_host_port("[::1]", 1080),
            Address::SocketAddr("[::1]:1080".parse().unwrap())
        );
        assert_eq!(
            Address::from_host_port("proxy.example.com", 1080),
            Address::Domain("proxy.example.com".to_string(), 1080)
        );
        assert_eq!(
            Address::from_host_port("[proxy.example.com]", 1080),
            Address::Domain("proxy.example.com".to_string(), 1080)
        );
        assert_eq!(
            Address::from_host_port("[proxy.example.com", 1080),
            Address::Domain("[proxy.example.com".to_string(), 1080)
        );
    }

    #[test]
    fn test_into_address() {
        assert_eq!(
            "example.com:443".into_address().unwrap(),
            Address::Domain("example.com".to_string(), 443)
        );
        assert_eq!(
            "[::1]:80".into_address().unwrap().to_socket_addr().unwrap(),
            "[::1]:80".parse::<SocketAddr>().unwrap()
        );
        assert!("example.com".into_address().is_err());
        assert_eq!(
            "example.com:443".into_address().unwrap().to_string(),
            "example.com:443"
        );
    }
}
