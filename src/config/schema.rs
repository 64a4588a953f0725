//! Configuration schema definitions.
//!
//! This module defines the complete declarative configuration of the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;

/// The only configuration API version this build understands.
pub const API_VERSION: &str = "v1alpha1";

/// Default log level specification.
pub const DEFAULT_LOG_LEVEL: &str = "all:INFO";

/// Default authentication realm.
pub const DEFAULT_REALM: &str = "relayd";

/// Default TURN/STUN port.
pub const DEFAULT_PORT: u16 = 3478;

/// Identity key of the admin singleton.
pub const DEFAULT_ADMIN_NAME: &str = "default-admin-config";

/// Identity key of the auth singleton.
pub const DEFAULT_AUTH_NAME: &str = "default-auth-config";

/// A configuration that identifies exactly one live object within its manager.
///
/// Singleton kinds return a fixed well-known key.
pub trait ResourceConfig: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Identity key of the resource.
    fn name(&self) -> &str;

    /// Semantic validation, run before the configuration is accepted.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Root configuration of the relay.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Schema version of this document.
    pub api_version: String,

    /// Daemon-wide settings.
    pub admin: AdminConfig,

    /// Credential validation settings.
    pub auth: AuthConfig,

    /// Ingress endpoints, unique by name.
    pub listeners: Vec<ListenerConfig>,

    /// Egress target sets, unique by name.
    pub clusters: Vec<ClusterConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            admin: AdminConfig::default(),
            auth: AuthConfig::default(),
            listeners: Vec::new(),
            clusters: Vec::new(),
        }
    }
}

/// Admin (daemon-wide) settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Log level specification, e.g. `all:INFO,listener:DEBUG`.
    pub log_level: String,

    /// Bind address of the admin introspection API (e.g. "127.0.0.1:8086").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Bind address of the Prometheus scrape endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_endpoint: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            address: None,
            metrics_endpoint: None,
        }
    }
}

/// Authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Static username/password pair.
    #[default]
    Plaintext,
    /// Time-limited credentials derived from a shared secret.
    Longterm,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Plaintext => write!(f, "plaintext"),
            AuthType::Longterm => write!(f, "longterm"),
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Authentication mode.
    #[serde(rename = "type")]
    pub auth_type: AuthType,

    /// Realm advertised to clients.
    pub realm: String,

    /// Mode-specific credential entries.
    pub credentials: BTreeMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_type: AuthType::Plaintext,
            realm: DEFAULT_REALM.to_string(),
            credentials: BTreeMap::new(),
        }
    }
}

/// Transport protocol of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Unique listener name.
    pub name: String,

    /// Transport protocol.
    #[serde(default)]
    pub protocol: Protocol,

    /// IP address to bind.
    #[serde(default = "default_address")]
    pub address: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Names of the clusters this listener may relay to.
    #[serde(default)]
    pub routes: Vec<String>,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Cluster type: how endpoints are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterType {
    /// Endpoints are IP addresses or CIDR prefixes.
    #[default]
    Static,
    /// Endpoints are host names resolved through the transport.
    StrictDns,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterType::Static => write!(f, "STATIC"),
            ClusterType::StrictDns => write!(f, "STRICT_DNS"),
        }
    }
}

/// Cluster configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Unique cluster name.
    pub name: String,

    /// Endpoint interpretation.
    #[serde(rename = "type", default)]
    pub cluster_type: ClusterType,

    /// Routing targets.
    #[serde(default)]
    pub endpoints: Vec<String>,
}
