//! Network service registry API types
//!
//! This library defines the messages exchanged with the registry server:
//! - NetworkServiceEndpoint: a named endpoint exposing a transport URL

pub mod endpoint;

pub use endpoint::NetworkServiceEndpoint;
