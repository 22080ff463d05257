//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! request
//!     → headers.rs (response hardening headers, wraps everything)
//!     → entrance.rs (secret entrance gate for UI paths)
//!     → API router (session middleware in admin/auth.rs)
//! ```
//!
//! # Design Decisions
//! - The entrance gate never protects `/api`; sessions do
//! - Gate decisions read the live config cache on every request, so moving
//!   the entrance takes effect without a restart

pub mod entrance;
pub mod headers;

pub use entrance::{entrance_middleware, EntranceDecision, EntranceGate};
pub use headers::security_headers_middleware;
