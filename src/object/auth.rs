//! Auth singleton: credential validation settings.

use crate::config::schema::{AuthConfig, AuthType, ResourceConfig, DEFAULT_AUTH_NAME};
use crate::object::{Built, Object, ObjectError, Outcome};
use crate::observability::logging::LoggerFactory;

/// Live authentication settings. Every change is applied in place.
#[derive(Debug)]
pub struct Auth {
    config: AuthConfig,
    span: tracing::Span,
}

impl Auth {
    pub fn new(config: &AuthConfig, logger: &LoggerFactory) -> Built<Self> {
        config.validate()?;
        let span = logger.new_logger("auth");
        span.in_scope(|| {
            tracing::debug!(auth_type = %config.auth_type, realm = %config.realm, "Auth created")
        });
        Ok((
            Self {
                config: config.clone(),
                span,
            },
            Outcome::Applied,
        ))
    }

    pub fn auth_type(&self) -> AuthType {
        self.config.auth_type
    }

    pub fn realm(&self) -> &str {
        &self.config.realm
    }
}

impl Object for Auth {
    type Config = AuthConfig;

    fn name(&self) -> &str {
        DEFAULT_AUTH_NAME
    }

    fn config(&self) -> AuthConfig {
        self.config.clone()
    }

    fn reconcile(&mut self, config: &AuthConfig) -> Result<Outcome, ObjectError> {
        let _enter = self.span.enter();
        config.validate()?;
        tracing::debug!(auth_type = %config.auth_type, realm = %config.realm, "Auth reconciled");
        self.config = config.clone();
        Ok(Outcome::Applied)
    }

    fn close(&mut self) -> Result<(), ObjectError> {
        Ok(())
    }
}
