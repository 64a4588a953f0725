//! Listener: a named ingress endpoint.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::config::schema::{ListenerConfig, ResourceConfig};
use crate::config::validation::ValidationError;
use crate::net::{BoundSocket, Transport};
use crate::object::{Built, Object, ObjectError, Outcome};
use crate::observability::logging::LoggerFactory;

/// A live listener.
///
/// Construction does not bind; the socket is bound by [`Listener::start`]
/// during the relay's start cycle. Changing protocol, address or port is
/// recorded immediately but the bound socket keeps serving the old address
/// until the next stop/start cycle.
#[derive(Debug)]
pub struct Listener {
    config: ListenerConfig,
    net: Arc<dyn Transport>,
    socket: Option<BoundSocket>,
    span: tracing::Span,
}

impl Listener {
    pub fn new(config: &ListenerConfig, net: Arc<dyn Transport>, logger: &LoggerFactory) -> Built<Self> {
        config.validate()?;
        let span = logger.new_logger("listener");
        span.in_scope(|| {
            tracing::debug!(
                name = %config.name,
                protocol = %config.protocol,
                address = %config.address,
                port = config.port,
                "Listener created"
            )
        });
        Ok((
            Self {
                config: config.clone(),
                net,
                socket: None,
                span,
            },
            Outcome::Applied,
        ))
    }

    /// Bind the socket for the current configuration. No-op when bound.
    pub fn start(&mut self) -> Result<(), ObjectError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let _enter = self.span.enter();
        let addr = socket_addr(&self.config)?;
        let socket = self.net.bind(self.config.protocol, addr)?;
        tracing::info!(name = %self.config.name, address = %socket.local_addr(), "Listener started");
        self.socket = Some(socket);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    /// Address the socket is actually bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().map(BoundSocket::local_addr)
    }

    pub fn routes(&self) -> &[String] {
        &self.config.routes
    }

    /// Whether the bound socket serves `config`. An unbound listener matches
    /// trivially; port 0 matches any ephemeral port.
    fn serves(&self, config: &ListenerConfig) -> bool {
        let Some(socket) = &self.socket else {
            return true;
        };
        let Ok(want) = socket_addr(config) else {
            return false;
        };
        socket.protocol() == config.protocol
            && socket.local_addr().ip() == want.ip()
            && (want.port() == 0 || socket.local_addr().port() == want.port())
    }
}

fn socket_addr(config: &ListenerConfig) -> Result<SocketAddr, ValidationError> {
    let ip: IpAddr = config.address.parse().map_err(|_| ValidationError::Address {
        kind: "listener",
        name: config.name.clone(),
        address: config.address.clone(),
    })?;
    Ok(SocketAddr::new(ip, config.port))
}

impl Object for Listener {
    type Config = ListenerConfig;

    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> ListenerConfig {
        self.config.clone()
    }

    fn reconcile(&mut self, config: &ListenerConfig) -> Result<Outcome, ObjectError> {
        let _enter = self.span.enter();
        config.validate()?;

        let rebind = config.protocol != self.config.protocol
            || config.address != self.config.address
            || config.port != self.config.port
            || !self.serves(config);

        self.config = config.clone();
        if rebind {
            tracing::info!(
                name = %config.name,
                protocol = %config.protocol,
                address = %config.address,
                port = config.port,
                "Listener address changed, restart required"
            );
            return Ok(Outcome::RestartRequired);
        }

        tracing::debug!(name = %config.name, routes = ?config.routes, "Listener reconciled");
        Ok(Outcome::Applied)
    }

    fn close(&mut self) -> Result<(), ObjectError> {
        if let Some(socket) = self.socket.take() {
            let _enter = self.span.enter();
            tracing::info!(name = %self.config.name, address = %socket.local_addr(), "Listener closed");
        }
        Ok(())
    }
}
