//! Rust TURN relay control plane
//!
//! Reconciles a declarative relay configuration (admin, auth, listeners,
//! clusters) against the live daemon, applying what can be applied hot and
//! reporting when a restart is required.

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod manager;
pub mod net;
pub mod object;
pub mod observability;
pub mod relay;

pub use config::schema::RelayConfig;
pub use lifecycle::Shutdown;
pub use object::Outcome;
pub use relay::{Error, Relay, RelayOptions};
