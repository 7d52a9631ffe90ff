//! GitHub repository client
//!
//! - [`transport`] the `GET` seam, the reqwest-backed default and cache-hit predicates
//! - [`client`] path normalization, URL building, outcome classification and 403 retry

pub mod client;
pub mod transport;

pub use client::{Fetched, HOSTING_PREFIX, RATE_LIMIT_RESET_HEADER, RepositoryClient};
pub use transport::{
    CachePredicate, ReqwestTransport, Transport, TransportResponse, cache_header_predicate,
};
