//! # Observability
//!
//! The estimators log through `tracing` and never install a subscriber.
//! Applications that want to see those events call [`init_logging`] once at
//! startup, typically with the `logging` section of a
//! [`CyclospecConfig`](crate::config::CyclospecConfig).
//!
//! ```text
//!   fam / ccsd / batch
//!   debug!() warn!() trace!()
//!            │
//!            ▼
//!   registry ─ EnvFilter ─ fmt layer (json | pretty | compact) ─▶ stderr
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
