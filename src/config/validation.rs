//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject duplicate listener/cluster names
//! - Validate addresses, endpoints and log level specifications
//!
//! # Design Decisions
//! - Validation is a pure function of the configuration
//! - Runs before any manager is touched; an invalid config never mutates state

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::{
    AdminConfig, AuthConfig, AuthType, ClusterConfig, ClusterType, ListenerConfig, RelayConfig,
    ResourceConfig, API_VERSION, DEFAULT_ADMIN_NAME, DEFAULT_AUTH_NAME,
};
use crate::object::cluster::Endpoint;
use crate::observability::logging::LogSpec;

/// A configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported api version \"{0}\", expected \"{expected}\"", expected = API_VERSION)]
    ApiVersion(String),

    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },

    #[error("duplicate {kind} name \"{name}\"")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{kind} \"{name}\": invalid address \"{address}\"")]
    Address {
        kind: &'static str,
        name: String,
        address: String,
    },

    #[error("cluster \"{cluster}\": invalid endpoint \"{endpoint}\"")]
    Endpoint { cluster: String, endpoint: String },

    #[error("invalid log level \"{0}\"")]
    LogLevel(String),

    #[error("{auth_type} authentication requires credential \"{key}\"")]
    MissingCredential {
        auth_type: AuthType,
        key: &'static str,
    },
}

impl RelayConfig {
    /// Validate the whole document: version, singletons, every listener and
    /// cluster, and name uniqueness within each list.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_version != API_VERSION {
            return Err(ValidationError::ApiVersion(self.api_version.clone()));
        }

        self.admin.validate()?;
        self.auth.validate()?;

        let mut seen = HashSet::new();
        for l in &self.listeners {
            l.validate()?;
            if !seen.insert(l.name.as_str()) {
                return Err(ValidationError::DuplicateName {
                    kind: "listener",
                    name: l.name.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for c in &self.clusters {
            c.validate()?;
            if !seen.insert(c.name.as_str()) {
                return Err(ValidationError::DuplicateName {
                    kind: "cluster",
                    name: c.name.clone(),
                });
            }
        }

        Ok(())
    }
}

fn check_socket_addr(name: &str, address: Option<&String>) -> Result<(), ValidationError> {
    match address {
        Some(a) if a.parse::<SocketAddr>().is_err() => Err(ValidationError::Address {
            kind: "admin",
            name: name.to_string(),
            address: a.clone(),
        }),
        _ => Ok(()),
    }
}

impl ResourceConfig for AdminConfig {
    fn name(&self) -> &str {
        DEFAULT_ADMIN_NAME
    }

    fn validate(&self) -> Result<(), ValidationError> {
        LogSpec::parse(&self.log_level)?;
        check_socket_addr(DEFAULT_ADMIN_NAME, self.address.as_ref())?;
        check_socket_addr(DEFAULT_ADMIN_NAME, self.metrics_endpoint.as_ref())
    }
}

impl ResourceConfig for AuthConfig {
    fn name(&self) -> &str {
        DEFAULT_AUTH_NAME
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let required: &[&'static str] = match self.auth_type {
            AuthType::Plaintext => &["username", "password"],
            AuthType::Longterm => &["secret"],
        };
        for &key in required {
            if self.credentials.get(key).map_or(true, |v| v.is_empty()) {
                return Err(ValidationError::MissingCredential {
                    auth_type: self.auth_type,
                    key,
                });
            }
        }
        Ok(())
    }
}

impl ResourceConfig for ListenerConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName { kind: "listener" });
        }
        if self.address.parse::<IpAddr>().is_err() {
            return Err(ValidationError::Address {
                kind: "listener",
                name: self.name.clone(),
                address: self.address.clone(),
            });
        }
        Ok(())
    }
}

impl ResourceConfig for ClusterConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName { kind: "cluster" });
        }
        for e in &self.endpoints {
            let ok = match self.cluster_type {
                ClusterType::Static => e.parse::<Endpoint>().is_ok(),
                ClusterType::StrictDns => !e.is_empty() && !e.contains('/'),
            };
            if !ok {
                return Err(ValidationError::Endpoint {
                    cluster: self.name.clone(),
                    endpoint: e.clone(),
                });
            }
        }
        Ok(())
    }
}
