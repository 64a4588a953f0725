//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Admin reconciliation:
//!     → logging.rs (LoggerFactory from the admin log level)
//!     → LogHandle rebinds the active filter
//!
//! Every reconciliation:
//!     → metrics.rs (resource gauges, outcome counter)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; the filter is swapped, never the subscriber
//! - Metrics are cheap (atomic increments) and exporter-agnostic

pub mod logging;
pub mod metrics;
