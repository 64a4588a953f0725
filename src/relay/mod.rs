//! The relay daemon: four resource managers and their lifecycle.
//!
//! # Data Flow
//! ```text
//! desired RelayConfig
//!     → reconcile.rs (validate → admin → auth → listener → cluster)
//!     → Outcome::Applied | Outcome::RestartRequired | Error
//!
//! Outcome::RestartRequired
//!     → caller runs close() + start() (or restart())
//!
//! snapshot.rs
//!     → current RelayConfig, read per manager
//! ```
//!
//! # Concurrency
//! Reconciliation, start and close serialize on one control lock. Snapshots
//! and status reads only take each manager's read lock and may observe the
//! four managers at slightly different points of an in-flight reconciliation.
//!
//! # Partial failure
//! A fatal error aborts the reconciliation but does not roll back managers
//! already reconciled in the same call. Re-reconcile with a corrected
//! configuration to converge.

mod reconcile;
mod snapshot;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::config::schema::{RelayConfig, API_VERSION};
use crate::config::validation::ValidationError;
use crate::manager::Manager;
use crate::net::{SystemNet, Transport};
use crate::object::{
    Admin, Auth, Cluster, DefaultFactory, Factory, Kind, Listener, Object, ObjectError,
};
use crate::observability::logging::{LogHandle, LoggerFactory};

/// Reconciliation or lifecycle failure.
#[derive(Debug, Error)]
pub enum Error {
    /// The desired configuration was rejected; nothing was changed.
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// An in-place update failed.
    #[error("could not reconcile {kind} config: {source}")]
    Reconcile {
        kind: Kind,
        #[source]
        source: ObjectError,
    },

    /// A factory failed to build a new object.
    #[error("could not create {kind} \"{name}\": {source}")]
    Construct {
        kind: Kind,
        name: String,
        #[source]
        source: ObjectError,
    },

    /// A listener could not be started.
    #[error("could not start listener \"{name}\": {source}")]
    Start {
        name: String,
        #[source]
        source: ObjectError,
    },
}

/// Collaborators of a relay.
pub struct RelayOptions {
    /// Network handle used by listeners and clusters.
    pub transport: Arc<dyn Transport>,
    /// Object constructors.
    pub factory: Arc<dyn Factory>,
    /// Installed subscriber to rebind after admin reconciliation.
    pub log_handle: Option<LogHandle>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            transport: Arc::new(SystemNet),
            factory: Arc::new(DefaultFactory),
            log_handle: None,
        }
    }
}

/// A running (or stopped) relay.
pub struct Relay {
    version: ArcSwap<String>,
    admin: Manager<Admin>,
    auth: Manager<Auth>,
    listeners: Manager<Listener>,
    clusters: Manager<Cluster>,
    net: Arc<dyn Transport>,
    factory: Arc<dyn Factory>,
    logger: ArcSwap<LoggerFactory>,
    log_handle: Option<LogHandle>,
    control: Mutex<()>,
    running: AtomicBool,
    /// Set by a start attempt, cleared by close. While set, every listener
    /// is expected to be bound.
    serving: AtomicBool,
}

/// Listener entry of [`Status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListenerStatus {
    pub name: String,
    pub bound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_addr: Option<SocketAddr>,
}

/// Cluster entry of [`Status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStatus {
    pub name: String,
    pub endpoints: Vec<String>,
}

/// Summary of the live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub version: String,
    pub running: bool,
    pub log_level: String,
    pub listeners: Vec<ListenerStatus>,
    pub clusters: Vec<ClusterStatus>,
}

impl Relay {
    /// Build a relay over the system network and reconcile `config` into it.
    pub fn new(config: &RelayConfig) -> Result<Self, Error> {
        Self::with_options(config, RelayOptions::default())
    }

    /// Build a relay with explicit collaborators and reconcile `config` into it.
    ///
    /// Nothing is bound until [`Relay::start`].
    pub fn with_options(config: &RelayConfig, options: RelayOptions) -> Result<Self, Error> {
        let relay = Self {
            version: ArcSwap::from_pointee(API_VERSION.to_string()),
            admin: Manager::new(Kind::Admin),
            auth: Manager::new(Kind::Auth),
            listeners: Manager::new(Kind::Listener),
            clusters: Manager::new(Kind::Cluster),
            net: options.transport,
            factory: options.factory,
            logger: ArcSwap::from_pointee(LoggerFactory::new(&config.admin.log_level)),
            log_handle: options.log_handle,
            control: Mutex::new(()),
            running: AtomicBool::new(false),
            serving: AtomicBool::new(false),
        };

        // Every listener is new here, so a restart verdict is expected.
        let outcome = relay.reconcile(config)?;
        tracing::debug!(?outcome, "Initial reconciliation finished");
        Ok(relay)
    }

    /// Bind every listener that is not bound yet.
    pub fn start(&self) -> Result<(), Error> {
        let _control = self.control.lock();
        self.start_locked()
    }

    /// Release every listener's socket.
    pub fn close(&self) {
        let _control = self.control.lock();
        self.close_locked();
    }

    /// Stop/start cycle completing a `RestartRequired` reconciliation.
    pub fn restart(&self) -> Result<(), Error> {
        let _control = self.control.lock();
        tracing::info!("Restarting relay");
        self.close_locked();
        self.start_locked()
    }

    fn start_locked(&self) -> Result<(), Error> {
        self.serving.store(true, Ordering::SeqCst);
        self.listeners.try_for_each_mut(|l| {
            l.start().map_err(|source| Error::Start {
                name: l.name().to_string(),
                source,
            })
        })?;
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(listeners = self.listeners.len(), "Relay started");
        Ok(())
    }

    fn close_locked(&self) {
        self.listeners.for_each_mut(|l| {
            if let Err(e) = l.close() {
                tracing::warn!(name = %l.name(), error = %e, "Error closing listener");
            }
        });
        self.running.store(false, Ordering::SeqCst);
        self.serving.store(false, Ordering::SeqCst);
        tracing::info!("Relay closed");
    }

    /// Whether a start was attempted since the last close but some listener
    /// is not bound, e.g. after a failed restart.
    fn missing_sockets(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
            && self.listeners.map(Listener::is_bound).contains(&false)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The logger factory derived from the current admin log level.
    pub fn logger(&self) -> Arc<LoggerFactory> {
        self.logger.load_full()
    }

    /// Names of the live listeners, in listing order.
    pub fn listener_names(&self) -> Vec<String> {
        self.listeners.keys()
    }

    /// Names of the live clusters, in listing order.
    pub fn cluster_names(&self) -> Vec<String> {
        self.clusters.keys()
    }

    /// Bound address of a listener.
    pub fn listener_addr(&self, name: &str) -> Option<SocketAddr> {
        self.listeners.with(name, Listener::local_addr).flatten()
    }

    /// Summary of the live state.
    pub fn status(&self) -> Status {
        Status {
            version: self.version.load().as_ref().clone(),
            running: self.is_running(),
            log_level: self.logger().level().to_string(),
            listeners: self.listeners.map(|l| ListenerStatus {
                name: l.name().to_string(),
                bound: l.is_bound(),
                local_addr: l.local_addr(),
            }),
            clusters: self.clusters.map(|c| ClusterStatus {
                name: c.name().to_string(),
                endpoints: c.endpoints().iter().map(ToString::to_string).collect(),
            }),
        }
    }
}
