//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl-C → Shutdown::trigger
//!     → reconcile loop exits → Relay::close
//!     → admin servers drain and stop
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
