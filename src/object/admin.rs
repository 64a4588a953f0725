//! Admin singleton: daemon-wide settings.

use crate::config::schema::{AdminConfig, ResourceConfig, DEFAULT_ADMIN_NAME};
use crate::object::{Built, Object, ObjectError, Outcome};
use crate::observability::logging::LoggerFactory;

/// Live admin settings.
///
/// The log level is applied by the relay right after this object is
/// reconciled. The admin API and metrics endpoints are bound at start, so
/// moving them needs a restart.
#[derive(Debug)]
pub struct Admin {
    config: AdminConfig,
    span: tracing::Span,
}

impl Admin {
    pub fn new(config: &AdminConfig, logger: &LoggerFactory) -> Built<Self> {
        config.validate()?;
        let span = logger.new_logger("admin");
        span.in_scope(|| tracing::debug!(log_level = %config.log_level, "Admin created"));
        Ok((
            Self {
                config: config.clone(),
                span,
            },
            Outcome::Applied,
        ))
    }

    pub fn log_level(&self) -> &str {
        &self.config.log_level
    }
}

impl Object for Admin {
    type Config = AdminConfig;

    fn name(&self) -> &str {
        DEFAULT_ADMIN_NAME
    }

    fn config(&self) -> AdminConfig {
        self.config.clone()
    }

    fn reconcile(&mut self, config: &AdminConfig) -> Result<Outcome, ObjectError> {
        let _enter = self.span.enter();
        config.validate()?;

        let outcome = if config.address != self.config.address
            || config.metrics_endpoint != self.config.metrics_endpoint
        {
            Outcome::RestartRequired
        } else {
            Outcome::Applied
        };

        tracing::debug!(log_level = %config.log_level, ?outcome, "Admin reconciled");
        self.config = config.clone();
        Ok(outcome)
    }

    fn close(&mut self) -> Result<(), ObjectError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Admin {
        Admin::new(&AdminConfig::default(), &LoggerFactory::default())
            .unwrap()
            .0
    }

    #[test]
    fn log_level_change_is_hot() {
        let mut a = admin();
        let mut c = AdminConfig::default();
        c.log_level = "all:DEBUG".into();
        assert_eq!(a.reconcile(&c).unwrap(), Outcome::Applied);
        assert_eq!(a.log_level(), "all:DEBUG");
    }

    #[test]
    fn moving_admin_api_requires_restart() {
        let mut a = admin();
        let mut c = AdminConfig::default();
        c.address = Some("127.0.0.1:8086".into());
        assert_eq!(a.reconcile(&c).unwrap(), Outcome::RestartRequired);
        assert_eq!(a.config().address.as_deref(), Some("127.0.0.1:8086"));
    }

    #[test]
    fn rejects_invalid_level() {
        let mut a = admin();
        let mut c = AdminConfig::default();
        c.log_level = "loud".into();
        assert!(a.reconcile(&c).is_err());
        assert_eq!(a.log_level(), AdminConfig::default().log_level);
    }
}
