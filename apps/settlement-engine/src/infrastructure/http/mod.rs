//! HTTP/REST API adapter.
//!
//! Inbound adapter exposing the option lifecycle. The caller identity is
//! read from the `x-caller-identity` header, which an authenticating gateway
//! in front of the service is expected to set.

mod controller;
mod request;
mod response;

pub use controller::{AppState, CALLER_HEADER, CallerIdentity, create_router};
pub use request::*;
pub use response::*;
