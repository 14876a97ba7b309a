//! worktrack client library
//!
//! A Rust async client library for asset-tracking servers speaking the
//! XML-over-HTTP REST protocol (`rest-1.v1` / `meta.v1` / `attachment.v1`).
//!
//! The two central pieces are [`WorktrackClient`], which owns the endpoint
//! configuration and turns paths and parameters into classified HTTP
//! exchanges, and [`Query`], a deferred builder that accumulates selection
//! fields and filter terms and hits the server exactly once when results
//! are first needed.

pub mod api;
pub mod auth;
pub mod error;
pub mod model;
pub mod transport;
pub mod xml;

mod client;

pub use client::*;
pub use api::query::FindSpec;
pub use api::query::Query;
pub use error::Error;
