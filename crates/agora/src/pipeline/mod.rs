//! Per-request middleware pipeline.
//!
//! A [`Stack`] is an ordered list of [`Middleware`] stages plus the factory
//! that creates each request's [`RequestScope`](crate::context::RequestScope).
//! Building a stack with route-specific terminal stages yields a
//! [`Pipeline`], the single entry point the HTTP host calls per request.

pub mod panic;
mod request;
mod response;
mod stack;

pub use request::Request;
pub use response::ResponseSink;
pub use stack::{from_fn, stage, Middleware, Next, Pipeline, Stack};
