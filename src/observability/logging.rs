//! Structured logging.
//!
//! # Responsibilities
//! - Parse the relay log level grammar (`all:INFO,listener:DEBUG`)
//! - Render it to a `tracing_subscriber::EnvFilter`
//! - Rebind the active filter at runtime after an admin reconciliation
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Scope `all` sets the default level, other scopes map to module targets
//! - Unknown scopes are passed through as raw targets (e.g. `tower_http`)

use std::fmt;

use tracing::Level;
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter,
    Registry,
};

use crate::config::schema::DEFAULT_LOG_LEVEL;
use crate::config::validation::ValidationError;

/// Verbosity of one scope. `None` disables the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScopeLevel(Option<Level>);

impl ScopeLevel {
    fn parse(s: &str) -> Option<Self> {
        let level = match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Some(Level::TRACE),
            "DEBUG" => Some(Level::DEBUG),
            "INFO" => Some(Level::INFO),
            "WARN" => Some(Level::WARN),
            "ERROR" => Some(Level::ERROR),
            "DISABLE" => None,
            _ => return None,
        };
        Some(ScopeLevel(level))
    }

    fn directive(&self) -> &'static str {
        match self.0 {
            Some(Level::TRACE) => "trace",
            Some(Level::DEBUG) => "debug",
            Some(Level::INFO) => "info",
            Some(Level::WARN) => "warn",
            Some(Level::ERROR) => "error",
            None => "off",
        }
    }
}

/// A parsed log level specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSpec {
    default: ScopeLevel,
    scopes: Vec<(String, ScopeLevel)>,
}

impl LogSpec {
    /// Parse `<scope>:<LEVEL>[,<scope>:<LEVEL>...]`.
    pub fn parse(spec: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::LogLevel(spec.to_string());

        let mut default = ScopeLevel(Some(Level::INFO));
        let mut scopes = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (scope, level) = part.split_once(':').ok_or_else(invalid)?;
            let scope = scope.trim();
            let level = ScopeLevel::parse(level).ok_or_else(invalid)?;
            if scope.is_empty() {
                return Err(invalid());
            }
            if scope.eq_ignore_ascii_case("all") {
                default = level;
            } else {
                scopes.push((scope.to_string(), level));
            }
        }

        Ok(Self { default, scopes })
    }
}

impl fmt::Display for LogSpec {
    /// Renders the `EnvFilter` directive string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default.directive())?;
        for (scope, level) in &self.scopes {
            write!(f, ",{}={}", target_of(scope), level.directive())?;
        }
        Ok(())
    }
}

fn target_of(scope: &str) -> String {
    match scope {
        "relay" | "manager" => format!("relayd::{scope}"),
        "api" => "relayd::admin".to_string(),
        "admin" | "auth" | "listener" | "cluster" => format!("relayd::object::{scope}"),
        other => other.to_string(),
    }
}

/// Produces loggers for one log level specification.
#[derive(Debug, Clone)]
pub struct LoggerFactory {
    level: String,
    spec: LogSpec,
}

impl LoggerFactory {
    /// Build a factory; an unparseable level falls back to the default.
    pub fn new(level: &str) -> Self {
        match LogSpec::parse(level) {
            Ok(spec) => Self {
                level: level.to_string(),
                spec,
            },
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default log level");
                Self::default()
            }
        }
    }

    /// The level specification this factory was built from.
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Filter to install on the subscriber.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.spec.to_string()).unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// A span scoping the events of one subsystem.
    pub fn new_logger(&self, scope: &'static str) -> tracing::Span {
        tracing::info_span!("relay", scope)
    }
}

impl Default for LoggerFactory {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            spec: LogSpec {
                default: ScopeLevel(Some(Level::INFO)),
                scopes: Vec::new(),
            },
        }
    }
}

/// Handle to the installed subscriber's filter.
#[derive(Clone)]
pub struct LogHandle {
    inner: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter with the factory's.
    pub fn apply(&self, factory: &LoggerFactory) {
        if let Err(e) = self.inner.reload(factory.env_filter()) {
            tracing::error!(error = %e, "failed to rebind log filter");
        }
    }
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

/// Install the global subscriber with a reloadable filter.
pub fn init(factory: &LoggerFactory) -> Result<LogHandle, tracing_subscriber::util::TryInitError> {
    let (filter, handle) = reload::Layer::new(factory.env_filter());
    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber_fmt::layer())
        .try_init()?;
    Ok(LogHandle { inner: handle })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};

    use super::*;
    use crate::config::schema::RelayConfig;
    use crate::relay::{Relay, RelayOptions};

    #[test]
    fn parses_default_and_scopes() {
        let spec = LogSpec::parse("all:WARN,listener:DEBUG").unwrap();
        assert_eq!(spec.to_string(), "warn,relayd::object::listener=debug");
    }

    #[test]
    fn level_names_are_case_insensitive() {
        let spec = LogSpec::parse("all:trace,cluster:Error").unwrap();
        assert_eq!(spec.to_string(), "trace,relayd::object::cluster=error");
    }

    #[test]
    fn disable_turns_scope_off() {
        let spec = LogSpec::parse("all:INFO,auth:DISABLE").unwrap();
        assert_eq!(spec.to_string(), "info,relayd::object::auth=off");
    }

    #[test]
    fn renders_env_filter_directives() {
        let spec = LogSpec::parse("all:ERROR,relay:DEBUG,tower_http:TRACE").unwrap();
        assert_eq!(
            spec.to_string(),
            "error,relayd::relay=debug,tower_http=trace"
        );
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(LogSpec::parse("INFO").is_err());
        assert!(LogSpec::parse("all:VERBOSE").is_err());
        assert!(LogSpec::parse(":INFO").is_err());
    }

    #[test]
    fn factory_falls_back_on_bad_level() {
        let f = LoggerFactory::new("nonsense");
        assert_eq!(f.level(), DEFAULT_LOG_LEVEL);
        assert_eq!(f.spec.to_string(), "info");
    }

    /// Counts events that pass the filter.
    #[derive(Clone, Default)]
    struct Counter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for Counter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() == "relayd::object::listener" {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn admin_log_level_rebinds_active_filter() {
        let mut config = RelayConfig::default();
        config.auth.credentials = BTreeMap::from([
            ("username".to_string(), "user".to_string()),
            ("password".to_string(), "pass".to_string()),
        ]);

        let (filter, handle) = reload::Layer::new(LoggerFactory::new(DEFAULT_LOG_LEVEL).env_filter());
        let counter = Counter::default();
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(counter.clone());

        tracing::subscriber::with_default(subscriber, || {
            let relay = Relay::with_options(
                &config,
                RelayOptions {
                    log_handle: Some(LogHandle { inner: handle }),
                    ..RelayOptions::default()
                },
            )
            .unwrap();

            tracing::debug!(target: "relayd::object::listener", "before");
            assert_eq!(counter.0.load(Ordering::SeqCst), 0);

            config.admin.log_level = "all:INFO,listener:DEBUG".to_string();
            relay.reconcile(&config).unwrap();

            tracing::debug!(target: "relayd::object::listener", "after");
            assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        });
    }
}
