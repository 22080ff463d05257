//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Open store → Seed defaults → Load cache → Build reloader, sessions, gate
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop reloader → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Reload the config cache now
//! ```
//!
//! # Design Decisions
//! - Fail fast: a store that cannot be read at startup is fatal
//! - Listeners start last (traffic only once the cache is loaded)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::handle_signals;
pub use startup::{bootstrap, StartupError};
