//! NetworkServiceEndpoint message
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels attached to a network service offered by an endpoint
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkServiceLabels {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// NetworkServiceEndpoint is a named endpoint reachable at a transport URL
///
/// Only `name` and `url` carry meaning for the registry chain. Every other
/// field, including unknown ones received on the wire, is passed through
/// untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkServiceEndpoint {
    /// Unique endpoint name
    #[serde(default)]
    pub name: String,

    /// Transport URL, e.g. `tcp://10.0.0.1:5001`
    #[serde(default)]
    pub url: String,

    /// Network services this endpoint provides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_service_names: Vec<String>,

    /// Labels per network service name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub network_service_labels: BTreeMap<String, NetworkServiceLabels>,

    /// When the registration expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,

    /// Fields this crate does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NetworkServiceEndpoint {
    /// Create an endpoint with just a name and URL
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }
}
