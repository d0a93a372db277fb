//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (route guard: principal or gateway token)
//!     → verifier.rs (Bearer token → Principal)
//!     → Pass to routing
//!
//! Outgoing request:
//!     → headers.rs (strip transport-framing headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any admission failure
//! - Caller credentials are forwarded so downstream services can re-check them

pub mod auth;
pub mod headers;
pub mod principal;
pub mod verifier;

pub use auth::{Admission, AuthError};
pub use principal::{Principal, Provider};
pub use verifier::{PrincipalVerifier, StaticVerifier, TokenInfoVerifier};
