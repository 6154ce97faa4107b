//! Stand-ins for the HTTP inputs of HTTP-triggered functions.

mod query;
mod request;

pub use query::*;
pub use request::*;
