//! Registry server contract shared by every server in a chain

use crate::next::Context;
use crate::Result;
use registry_api::NetworkServiceEndpoint;

/// A registry server handles endpoint registration.
///
/// Servers are composed with [`crate::next::ChainBuilder`]. Inside a chain a
/// server passes the call on with `next_server(ctx).register(ctx, nse)`, or
/// returns without doing so to end the chain early.
#[async_trait::async_trait]
pub trait NetworkServiceEndpointRegistryServer: Send + Sync {
    /// Server name for logging
    fn name(&self) -> &'static str {
        "UnnamedServer"
    }

    async fn register(
        &self,
        ctx: &Context,
        nse: NetworkServiceEndpoint,
    ) -> Result<NetworkServiceEndpoint>;

    async fn unregister(&self, ctx: &Context, nse: NetworkServiceEndpoint) -> Result<()>;
}
