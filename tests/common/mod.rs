//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use relayd::config::schema::{
    AdminConfig, AuthConfig, AuthType, ClusterConfig, ClusterType, ListenerConfig, Protocol,
    RelayConfig, API_VERSION,
};
use relayd::net::{BoundSocket, NetError, Transport};
use relayd::object::{Built, Cluster, Factory, ObjectError};
use relayd::observability::logging::LoggerFactory;
use relayd::{Outcome, Relay, RelayOptions};

/// A transport that binds nothing and records every call.
#[derive(Debug, Default)]
pub struct MockNet {
    binds: Mutex<Vec<(Protocol, SocketAddr)>>,
    fail_bind: Mutex<HashSet<SocketAddr>>,
    hosts: Mutex<HashMap<String, Vec<IpAddr>>>,
}

impl MockNet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every bind, in call order.
    pub fn binds(&self) -> Vec<(Protocol, SocketAddr)> {
        self.binds.lock().clone()
    }

    pub fn fail_bind(&self, addr: SocketAddr) {
        self.fail_bind.lock().insert(addr);
    }

    pub fn allow_bind(&self, addr: SocketAddr) {
        self.fail_bind.lock().remove(&addr);
    }

    pub fn add_host(&self, host: &str, ips: &[&str]) {
        let ips = ips.iter().map(|ip| ip.parse().unwrap()).collect();
        self.hosts.lock().insert(host.to_string(), ips);
    }
}

impl Transport for MockNet {
    fn bind(&self, protocol: Protocol, addr: SocketAddr) -> Result<BoundSocket, NetError> {
        if self.fail_bind.lock().contains(&addr) {
            return Err(NetError::Bind {
                protocol,
                addr,
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
            });
        }
        self.binds.lock().push((protocol, addr));
        Ok(BoundSocket::detached(protocol, addr))
    }

    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, NetError> {
        self.hosts
            .lock()
            .get(host)
            .cloned()
            .ok_or_else(|| NetError::Resolve {
                host: host.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unknown host"),
            })
    }
}

/// Builds the stock objects; named clusters fail to build or report that
/// they need a restart.
#[derive(Debug, Default)]
pub struct ScriptedFactory {
    failing: Mutex<HashSet<String>>,
    restarting: Mutex<HashSet<String>>,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_cluster(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    pub fn restart_cluster(&self, name: &str) {
        self.restarting.lock().insert(name.to_string());
    }
}

impl Factory for ScriptedFactory {
    fn new_cluster(
        &self,
        config: &ClusterConfig,
        net: &Arc<dyn Transport>,
        logger: &LoggerFactory,
    ) -> Built<Cluster> {
        if self.failing.lock().contains(&config.name) {
            return Err(ObjectError::Other(format!("cannot create cluster {}", config.name)));
        }
        let (cluster, outcome) = Cluster::new(config, Arc::clone(net), logger)?;
        if self.restarting.lock().contains(&config.name) {
            return Ok((cluster, Outcome::RestartRequired));
        }
        Ok((cluster, outcome))
    }
}

pub fn listener(name: &str, port: u16) -> ListenerConfig {
    ListenerConfig {
        name: name.to_string(),
        protocol: Protocol::Udp,
        address: "127.0.0.1".to_string(),
        port,
        routes: vec!["media".to_string()],
    }
}

pub fn cluster(name: &str, endpoints: &[&str]) -> ClusterConfig {
    ClusterConfig {
        name: name.to_string(),
        cluster_type: ClusterType::Static,
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
    }
}

pub fn config(listeners: Vec<ListenerConfig>, clusters: Vec<ClusterConfig>) -> RelayConfig {
    RelayConfig {
        api_version: API_VERSION.to_string(),
        admin: AdminConfig::default(),
        auth: AuthConfig {
            auth_type: AuthType::Plaintext,
            realm: "test".to_string(),
            credentials: BTreeMap::from([
                ("username".to_string(), "user".to_string()),
                ("password".to_string(), "pass".to_string()),
            ]),
        },
        listeners,
        clusters,
    }
}

/// Two listeners routed to one cluster.
pub fn base_config() -> RelayConfig {
    config(
        vec![listener("a", 30001), listener("b", 30002)],
        vec![cluster("media", &["10.0.0.0/8"])],
    )
}

pub fn relay_with(
    config: &RelayConfig,
    net: Arc<MockNet>,
    factory: Arc<dyn Factory>,
) -> Relay {
    Relay::with_options(
        config,
        RelayOptions {
            transport: net,
            factory,
            log_handle: None,
        },
    )
    .expect("initial reconciliation")
}

pub fn relay(config: &RelayConfig) -> (Relay, Arc<MockNet>) {
    let net = MockNet::new();
    let relay = relay_with(config, net.clone(), Arc::new(relayd::object::DefaultFactory));
    (relay, net)
}

/// Collects the message of every event emitted while installed.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CaptureLayer {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.messages.lock().push(message);
    }
}
