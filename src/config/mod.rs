//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML/JSON)      turn:// URI
//!     → loader.rs (env expansion,       → uri.rs (default config)
//!       parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated)
//!     → Relay::reconcile
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates
//!     → new RelayConfig sent to the reconcile loop
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A file that fails to load is logged and the running config kept

pub mod loader;
pub mod schema;
pub mod uri;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, AuthType, ClusterConfig, ClusterType, ListenerConfig, Protocol,
    RelayConfig, ResourceConfig,
};
pub use uri::default_config;
pub use validation::ValidationError;
