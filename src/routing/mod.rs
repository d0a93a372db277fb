//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (rule lookup, first match wins)
//!     → matcher.rs (evaluate method + segment pattern, capture params)
//!     → resolver.rs (apply rewrites, extract service segment)
//!     → directory.rs (service → base URL)
//!     → Return: ResolvedTarget or RouteError
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile matchers
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes and directory built at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route

pub mod directory;
pub mod matcher;
pub mod resolver;
pub mod router;

pub use directory::ServiceDirectory;
pub use resolver::{ResolvedTarget, RouteError, RouteResolver};
pub use router::{RouteMatch, RouteRule, Router};
