//! HTTP protocol layer module
//!
//! Protocol helpers shared by every endpoint, independent of application logic:
//! body reading, cookies, caching validators, ranges, MIME types and response builders.

pub mod body;
pub mod cache;
pub mod cookie;
pub mod mime;
pub mod range;
pub mod response;

pub use body::{BodyError, Payload};
pub use response::HttpResponse;
