//! Core registry server chain
//!
//! This library provides:
//! - The registry server contract and next-server chaining
//! - The interpose server, which tracks cross-connect endpoints
//! - A concurrent name to URL map shared with cross-connect resolvers

pub mod error;
pub mod interpose;
pub mod next;
pub mod server;
pub mod url_map;

pub use error::{RegistryError, Result};
pub use interpose::InterposeServer;
pub use next::{next_server, with_next_server, ChainBuilder, Context, NextServer, TailServer};
pub use server::NetworkServiceEndpointRegistryServer;
pub use url_map::UrlMap;
