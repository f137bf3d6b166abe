//! SQLite storage layer for mnemo
//!
//! One local database file recording assistant sessions, tool-use
//! observations, end-of-session summaries and raw user prompts, behind a
//! versioned migration engine and a windowed timeline read path. All
//! operations are synchronous blocking calls; async wrapping belongs to the
//! service layer.

mod diagnostics;
mod error;
mod migrations;
mod store;
#[cfg(test)]
mod tests;

pub use diagnostics::{CapturingDiagnostics, DiagnosticEvent, DiagnosticsSink, TracingDiagnostics};
pub use error::{Result, StorageError};
pub use migrations::SCHEMA_VERSION;
pub use store::{Storage, StorageStats};
