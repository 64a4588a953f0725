//! Reconciliation orchestrator.

use std::sync::Arc;

use crate::config::schema::{RelayConfig, ResourceConfig, DEFAULT_ADMIN_NAME};
use crate::manager::Manager;
use crate::object::{Built, Object, Outcome};
use crate::observability::logging::LoggerFactory;
use crate::observability::metrics;
use crate::relay::{Error, Relay};

/// Result of reconciling one kind.
struct Step {
    outcome: Outcome,
    created: usize,
}

impl Relay {
    /// Converge the live state to `desired`.
    ///
    /// Kinds are reconciled in a fixed order: admin, auth, listener, cluster.
    /// Returns `Outcome::Applied` when everything is live,
    /// `Outcome::RestartRequired` when the caller must run a stop/start cycle
    /// (always the case when a listener was added), and an error when the
    /// configuration was rejected or a step failed. After a failed step the
    /// kinds reconciled before it keep their new state.
    pub fn reconcile(&self, desired: &RelayConfig) -> Result<Outcome, Error> {
        let _control = self.control.lock();
        let result = self.reconcile_locked(desired);
        metrics::record_reconcile(match &result {
            Ok(Outcome::Applied) => "applied",
            Ok(Outcome::RestartRequired) => "restart",
            Err(_) => "failed",
        });
        metrics::record_resources(self.listeners.len(), self.clusters.len());
        result
    }

    fn reconcile_locked(&self, desired: &RelayConfig) -> Result<Outcome, Error> {
        tracing::debug!(
            api_version = %desired.api_version,
            listeners = desired.listeners.len(),
            clusters = desired.clusters.len(),
            "Reconciling relay"
        );

        desired.validate()?;
        self.version.store(Arc::new(desired.api_version.clone()));

        // admin
        let logger = self.logger.load_full();
        let admin = self.reconcile_kind(&self.admin, std::slice::from_ref(&desired.admin), |c| {
            self.factory.new_admin(c, &logger)
        })?;
        self.rebind_logger(desired);
        let logger = self.logger.load_full();

        // auth
        let auth = self.reconcile_kind(&self.auth, std::slice::from_ref(&desired.auth), |c| {
            self.factory.new_auth(c, &logger)
        })?;

        // listener: a new socket is only bound by a stop/start cycle
        let mut listener = self.reconcile_kind(&self.listeners, &desired.listeners, |c| {
            self.factory.new_listener(c, &self.net, &logger)
        })?;
        if listener.created > 0 {
            listener.outcome = Outcome::RestartRequired;
        }
        if self.missing_sockets() {
            tracing::warn!("listeners left unbound by the last start, restart required");
            listener.outcome = Outcome::RestartRequired;
        }
        if self.listeners.is_empty() {
            tracing::warn!("running with no listeners");
        }

        // cluster
        let cluster = self.reconcile_kind(&self.clusters, &desired.clusters, |c| {
            self.factory.new_cluster(c, &self.net, &logger)
        })?;
        if self.clusters.is_empty() {
            tracing::warn!("running with no clusters: received traffic will be dropped");
        }

        let outcome = admin
            .outcome
            .merge(auth.outcome)
            .merge(listener.outcome)
            .merge(cluster.outcome);
        tracing::info!(?outcome, "Reconciliation finished");
        Ok(outcome)
    }

    /// Diff one manager, build what is new, register it.
    fn reconcile_kind<O: Object>(
        &self,
        manager: &Manager<O>,
        desired: &[O::Config],
        build: impl Fn(&O::Config) -> Built<O>,
    ) -> Result<Step, Error> {
        let kind = manager.kind();
        let delta = manager
            .reconcile(desired)
            .map_err(|source| Error::Reconcile { kind, source })?;

        let mut outcome = delta.outcome;
        for config in &delta.to_construct {
            let (object, built) = build(config).map_err(|source| Error::Construct {
                kind,
                name: config.name().to_string(),
                source,
            })?;
            tracing::info!(%kind, name = %config.name(), "Object created");
            outcome = outcome.merge(built);
            manager.upsert(object);
        }

        Ok(Step {
            outcome,
            created: delta.to_construct.len(),
        })
    }

    /// Re-derive the logger from the admin object and make it active.
    fn rebind_logger(&self, desired: &RelayConfig) {
        let level = self
            .admin
            .get(DEFAULT_ADMIN_NAME)
            .map(|c| c.log_level)
            .unwrap_or_else(|| desired.admin.log_level.clone());

        if self.logger.load().level() == level {
            return;
        }

        let logger = LoggerFactory::new(&level);
        if let Some(handle) = &self.log_handle {
            handle.apply(&logger);
        }
        self.logger.store(Arc::new(logger));
        tracing::info!(log_level = %level, "Log level updated");
    }
}
