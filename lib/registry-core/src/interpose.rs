//! Interpose server: tracks cross-connect endpoints
//!
//! A cross-connect endpoint is one whose name ends with
//! [`INTERPOSE_NSE_SUFFIX`]. These registrations exist only so other
//! components can look up their URLs, so the interpose server records them in
//! a [`UrlMap`] and ends the chain there. All other endpoints pass through.

use crate::next::{next_server, Context};
use crate::server::NetworkServiceEndpointRegistryServer;
use crate::url_map::UrlMap;
use crate::{RegistryError, Result};
use registry_api::NetworkServiceEndpoint;
use tracing::{debug, warn};
use url::Url;

/// Name suffix marking a cross-connect endpoint
pub const INTERPOSE_NSE_SUFFIX: &str = "#interpose-nse";

/// Whether `name` belongs to a cross-connect endpoint
pub fn is_interpose_nse(name: &str) -> bool {
    name.ends_with(INTERPOSE_NSE_SUFFIX)
}

/// Cross-connect endpoint name for `base`
pub fn interpose_nse_name(base: &str) -> String {
    format!("{}{}", base, INTERPOSE_NSE_SUFFIX)
}

/// Name without the cross-connect suffix, or None for ordinary names
pub fn base_name(name: &str) -> Option<&str> {
    name.strip_suffix(INTERPOSE_NSE_SUFFIX)
}

pub struct InterposeServer {
    cross_nses: UrlMap,
}

impl InterposeServer {
    /// Create an interpose server recording into `cross_nses`
    pub fn new(cross_nses: UrlMap) -> Self {
        Self { cross_nses }
    }
}

#[async_trait::async_trait]
impl NetworkServiceEndpointRegistryServer for InterposeServer {
    fn name(&self) -> &'static str {
        "InterposeServer"
    }

    async fn register(
        &self,
        ctx: &Context,
        nse: NetworkServiceEndpoint,
    ) -> Result<NetworkServiceEndpoint> {
        if !is_interpose_nse(&nse.name) {
            return next_server(ctx).register(ctx, nse).await;
        }

        let url = Url::parse(&nse.url).map_err(|source| {
            warn!("Rejected cross-connect endpoint {} with URL {:?}: {}", nse.name, nse.url, source);
            RegistryError::InvalidEndpoint {
                name: nse.name.clone(),
                source,
            }
        })?;

        debug!("Registered cross-connect endpoint {} at {}", nse.name, url);
        self.cross_nses.store(nse.name.clone(), url);

        Ok(nse)
    }

    async fn unregister(&self, ctx: &Context, nse: NetworkServiceEndpoint) -> Result<()> {
        if !is_interpose_nse(&nse.name) {
            return next_server(ctx).unregister(ctx, nse).await;
        }

        if self.cross_nses.load_and_delete(&nse.name).is_some() {
            debug!("Unregistered cross-connect endpoint {}", nse.name);
        }
        Ok(())
    }
}
