//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Relay::start()
//!     → Transport::bind (one socket per listener)
//!     → listener.rs (BoundSocket owned by the listener object)
//!     → handed to the protocol engine
//!
//! Cluster construction / update (STRICT_DNS):
//!     → Transport::resolve
//! ```
//!
//! # Design Decisions
//! - The reconciliation core never touches sockets directly; it goes through
//!   the `Transport` handle so tests can substitute a recording fake
//! - Sockets are bound non-blocking so an async runtime can adopt them

pub mod listener;

use std::fmt;
use std::net::{IpAddr, SocketAddr, TcpListener, ToSocketAddrs, UdpSocket};

use thiserror::Error;

use crate::config::schema::Protocol;
pub use listener::BoundSocket;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum NetError {
    /// Failed to bind to address.
    #[error("failed to bind {protocol}://{addr}: {source}")]
    Bind {
        protocol: Protocol,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Failed to resolve a host name.
    #[error("failed to resolve \"{host}\": {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
}

/// Opaque handle to the network layer.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Bind a listening socket.
    fn bind(&self, protocol: Protocol, addr: SocketAddr) -> Result<BoundSocket, NetError>;

    /// Resolve a host name to its addresses.
    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, NetError>;
}

/// Transport backed by the operating system's sockets and resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNet;

impl Transport for SystemNet {
    fn bind(&self, protocol: Protocol, addr: SocketAddr) -> Result<BoundSocket, NetError> {
        let err = |source| NetError::Bind {
            protocol,
            addr,
            source,
        };

        let socket = match protocol {
            Protocol::Udp => {
                let s = UdpSocket::bind(addr).map_err(err)?;
                s.set_nonblocking(true).map_err(err)?;
                BoundSocket::udp(s).map_err(err)?
            }
            Protocol::Tcp => {
                let s = TcpListener::bind(addr).map_err(err)?;
                s.set_nonblocking(true).map_err(err)?;
                BoundSocket::tcp(s).map_err(err)?
            }
        };

        tracing::info!(
            protocol = %protocol,
            address = %socket.local_addr(),
            "Socket bound"
        );
        Ok(socket)
    }

    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, NetError> {
        let addrs = (host, 0)
            .to_socket_addrs()
            .map_err(|source| NetError::Resolve {
                host: host.to_string(),
                source,
            })?;
        let mut ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
        ips.sort();
        ips.dedup();
        Ok(ips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_ephemeral_udp_socket() {
        let s = SystemNet
            .bind(Protocol::Udp, "127.0.0.1:0".parse().unwrap())
            .unwrap();
        assert_eq!(s.protocol(), Protocol::Udp);
        assert_ne!(s.local_addr().port(), 0);
    }

    #[test]
    fn bind_conflict_is_reported() {
        let first = SystemNet
            .bind(Protocol::Tcp, "127.0.0.1:0".parse().unwrap())
            .unwrap();
        let err = SystemNet
            .bind(Protocol::Tcp, first.local_addr())
            .unwrap_err();
        assert!(matches!(err, NetError::Bind { .. }));
    }

    #[test]
    fn resolves_ip_literals() {
        let ips = SystemNet.resolve("127.0.0.1").unwrap();
        assert_eq!(ips, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }
}
