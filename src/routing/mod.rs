//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     AppRouter verb calls, filters, exception mappings
//!     → collected into immutable registration lists
//!     → frozen when the server builds the runtime router
//!
//! Incoming request:
//!     runtime matches the path pattern
//!     → find_route (method + accept resolution, registration order)
//!     → matcher.rs decides which filters apply
//!     → errors resolved through the exception registry by kind tag
//! ```
//!
//! # Design Decisions
//! - Registrations compiled at startup, immutable at runtime
//! - No regex in the hot path (segment matching only)
//! - First match wins (registration order)
//! - Exception lookup is an exact map on kind tags with explicit fallback

pub mod matcher;
pub mod router;

pub use matcher::{AcceptMatcher, Matcher, PathPatternMatcher};
pub use router::{AppRouter, HandlerResult, Route, RouteOptions};
