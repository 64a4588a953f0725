//! Listening sockets owned by listener objects.

use std::net::{SocketAddr, TcpListener, UdpSocket};

use crate::config::schema::Protocol;

/// Owned only to keep the port bound until the record is dropped.
#[derive(Debug)]
#[allow(dead_code)]
enum Inner {
    Udp(UdpSocket),
    Tcp(TcpListener),
    /// No OS socket behind it; used by transports that only simulate binding.
    Detached,
}

/// A socket bound for one listener.
///
/// Dropping it releases the port.
#[derive(Debug)]
pub struct BoundSocket {
    protocol: Protocol,
    local_addr: SocketAddr,
    inner: Inner,
}

impl BoundSocket {
    pub(crate) fn udp(socket: UdpSocket) -> std::io::Result<Self> {
        Ok(Self {
            protocol: Protocol::Udp,
            local_addr: socket.local_addr()?,
            inner: Inner::Udp(socket),
        })
    }

    pub(crate) fn tcp(listener: TcpListener) -> std::io::Result<Self> {
        Ok(Self {
            protocol: Protocol::Tcp,
            local_addr: listener.local_addr()?,
            inner: Inner::Tcp(listener),
        })
    }

    /// A socket record without an OS socket.
    pub fn detached(protocol: Protocol, local_addr: SocketAddr) -> Self {
        Self {
            protocol,
            local_addr,
            inner: Inner::Detached,
        }
    }

    /// Get the transport protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Get the local address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
