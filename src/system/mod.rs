//! System-level modules
//!
//! - Logging initialization
//! - Cancellation shared between the signal listener and the bootstrap
//! - Shutdown signal handling

pub mod cancel;
pub mod logging;
pub mod signal;

pub use cancel::CancellationToken;
pub use logging::init_logging;
pub use signal::spawn_shutdown_listener;
