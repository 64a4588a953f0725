//! Live resource objects.
//!
//! # Data Flow
//! ```text
//! validated config
//!     → Factory::new_<kind> (fresh identity)       → Manager::upsert
//!     → Object::reconcile   (existing identity)    → Outcome
//!     → Object::close       (identity removed)     → resources released
//! ```
//!
//! # Design Decisions
//! - An object's identity never changes; only its config and live resources do
//! - "Restart required" is an `Outcome`, never an error, so callers that only
//!   check for errors cannot mistake it for a failure
//! - Admin and auth are singletons keyed by a fixed name

pub mod admin;
pub mod auth;
pub mod cluster;
pub mod listener;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::schema::{AdminConfig, AuthConfig, ClusterConfig, ListenerConfig, ResourceConfig};
use crate::config::validation::ValidationError;
use crate::net::{NetError, Transport};
use crate::observability::logging::LoggerFactory;

pub use admin::Admin;
pub use auth::Auth;
pub use cluster::Cluster;
pub use listener::Listener;

/// Result of applying a configuration to live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The configuration is live.
    Applied,
    /// The configuration was accepted but takes full effect only after a
    /// stop/start cycle.
    RestartRequired,
}

impl Outcome {
    /// Combine two outcomes; restart wins.
    pub fn merge(self, other: Outcome) -> Outcome {
        if self == Outcome::RestartRequired || other == Outcome::RestartRequired {
            Outcome::RestartRequired
        } else {
            Outcome::Applied
        }
    }

    pub fn restart_required(self) -> bool {
        self == Outcome::RestartRequired
    }
}

/// Failure of an in-place update, a construction or a teardown.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error("{0}")]
    Other(String),
}

/// The resource kinds, in reconciliation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Admin,
    Auth,
    Listener,
    Cluster,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Admin => "admin",
            Kind::Auth => "auth",
            Kind::Listener => "listener",
            Kind::Cluster => "cluster",
        };
        f.write_str(s)
    }
}

/// A live, named instance of one resource kind.
pub trait Object: Send + Sync + 'static {
    type Config: ResourceConfig;

    /// Identity key; stable for the object's lifetime.
    fn name(&self) -> &str;

    /// Current configuration.
    fn config(&self) -> Self::Config;

    /// Apply `config` in place.
    ///
    /// Returns `RestartRequired` when part of the change can only take effect
    /// after a stop/start cycle; the object keeps serving in the meantime.
    fn reconcile(&mut self, config: &Self::Config) -> Result<Outcome, ObjectError>;

    /// Release live resources.
    fn close(&mut self) -> Result<(), ObjectError>;
}

/// A freshly built object with the outcome of its construction.
pub type Built<O> = Result<(O, Outcome), ObjectError>;

/// Constructors for new objects, one per kind.
///
/// The default methods build the stock objects; embedders and tests override
/// individual kinds.
pub trait Factory: Send + Sync {
    fn new_admin(&self, config: &AdminConfig, logger: &LoggerFactory) -> Built<Admin> {
        Admin::new(config, logger)
    }

    fn new_auth(&self, config: &AuthConfig, logger: &LoggerFactory) -> Built<Auth> {
        Auth::new(config, logger)
    }

    fn new_listener(
        &self,
        config: &ListenerConfig,
        net: &Arc<dyn Transport>,
        logger: &LoggerFactory,
    ) -> Built<Listener> {
        Listener::new(config, Arc::clone(net), logger)
    }

    fn new_cluster(
        &self,
        config: &ClusterConfig,
        net: &Arc<dyn Transport>,
        logger: &LoggerFactory,
    ) -> Built<Cluster> {
        Cluster::new(config, Arc::clone(net), logger)
    }
}

/// Factory building the stock objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactory;

impl Factory for DefaultFactory {}
