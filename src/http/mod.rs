//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace span, timeout, security headers)
//!     → security::entrance (UI paths only)
//!     → /api/v1 routes (admin handlers, session validator on protected ones)
//!     → anything else: panel UI files or placeholder page
//!     → response.rs (JSON error rendering)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
