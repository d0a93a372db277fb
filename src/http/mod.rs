//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (request ID, buffered InboundRequest)
//!     → [proxy::Gateway produces a RerouteOutcome]
//!     → response.rs (outcome → HTTP response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
