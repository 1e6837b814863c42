//! # Diagnostics
//!
//! Observability events and the default handler that logs them.

pub mod diagnostic;
pub mod logging;

pub use diagnostic::DiagnosticEvent;
pub use logging::LoggingDiagnosticHandler;
