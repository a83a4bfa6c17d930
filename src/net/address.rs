//! Address value exposed to request logic.
//!
//! A connection carries two addresses: the socket peer address used for real
//! I/O, and the *visible* address every pipeline stage reads. Only the visible
//! one is ever rewritten.

use std::net::SocketAddr;

use socket2::SockAddr;

/// Structured address, its socket length and display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleAddress {
    sockaddr: SocketAddr,
    socklen: u32,
    text: String,
}

impl VisibleAddress {
    /// Build the visible form of a socket peer address.
    ///
    /// The display text is the bare IP, without the port.
    pub fn from_socket(addr: SocketAddr) -> Self {
        Self::new(addr, addr.ip().to_string())
    }

    /// Build a visible address with an explicit display text.
    pub fn new(sockaddr: SocketAddr, text: impl Into<String>) -> Self {
        Self::from_parts(sockaddr, socklen_of(sockaddr), text.into())
    }

    pub(crate) fn from_parts(sockaddr: SocketAddr, socklen: u32, text: String) -> Self {
        Self {
            sockaddr,
            socklen,
            text,
        }
    }

    pub fn sockaddr(&self) -> SocketAddr {
        self.sockaddr
    }

    /// Length of the native socket address structure for this family.
    pub fn socklen(&self) -> u32 {
        self.socklen
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for VisibleAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

fn socklen_of(addr: SocketAddr) -> u32 {
    SockAddr::from(addr).len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_omits_port() {
        let addr = VisibleAddress::from_socket("203.0.113.7:51000".parse().unwrap());
        assert_eq!(addr.text(), "203.0.113.7");
        assert_eq!(addr.sockaddr().port(), 51000);
    }

    #[test]
    fn socklen_follows_family() {
        let v4 = VisibleAddress::from_socket("10.0.0.1:80".parse().unwrap());
        let v6 = VisibleAddress::from_socket("[2001:db8::1]:80".parse().unwrap());
        assert!(v4.socklen() > 0);
        assert!(v6.socklen() > v4.socklen());
    }
}
