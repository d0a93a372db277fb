//! Proxy subsystem: from a routed request to a single outcome.
//!
//! # Data Flow
//! ```text
//! gateway.rs (route, admit, rewrite, resolve, plan)
//!     → dispatcher.rs (identity pre-action, compensation on failure)
//!     → forwarder.rs (one downstream call)
//!     → outcome.rs (RerouteOutcome, normalized by http::response)
//! ```
//!
//! # Design Decisions
//! - Every failure is a value, never a panic or an early HTTP response
//! - Forwarder and identity store sit behind traits so tests can swap them

pub mod dispatcher;
pub mod forwarder;
pub mod gateway;
pub mod outcome;

pub use dispatcher::{CompensableDispatcher, PreActionPlan, SagaStage};
pub use forwarder::{Forward, HttpForwarder, OutboundRequest};
pub use gateway::{Gateway, Routed};
pub use outcome::{FailureKind, RerouteOutcome};
