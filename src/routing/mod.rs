//! Routing module
//!
//! Provides the application route table:
//! - Linear lookup over `(method, pattern)` entries
//! - `:name` path parameters
//! - 404 vs 405 distinction with the list of allowed methods

mod router;

pub use router::{allow_header, Lookup, Params, Router};
