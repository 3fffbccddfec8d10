//! # signalfire-director
//!
//! Blocking HTTP client for a director's API.
//!
//! [`HttpDirector::connect`] resolves the target URL, reads `/info` to learn
//! the director's identity and authentication scheme, logs in once, and
//! returns a client implementing [`signalfire_core::DirectorClient`].
//! Targets may pin a private CA or skip certificate checks; see [`tls`].

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod tls;

pub use auth::Authorizer;
pub use client::{DirectorInfo, HttpDirector};
pub use endpoint::canonicalize_url;
