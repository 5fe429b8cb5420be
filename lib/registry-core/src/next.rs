//! Next-server chaining for registry servers
//!
//! A chain is an ordered list of servers. Each call carries its own cursor
//! into that list inside the [`Context`], so a server only ever needs
//! [`next_server`] to hand the call on, whatever chain it sits in.

use crate::server::NetworkServiceEndpointRegistryServer;
use crate::Result;
use registry_api::NetworkServiceEndpoint;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug_span, Instrument};

type Server = Arc<dyn NetworkServiceEndpointRegistryServer>;

/// Position of one call inside a chain
#[derive(Clone)]
struct Cursor {
    servers: Arc<[Server]>,
    index: usize,
    /// Cursor of the enclosing chain, resumed once this one is exhausted
    parent: Option<Arc<Cursor>>,
    tail: Server,
}

enum Hop {
    Server(Server, Cursor),
    Tail(Server),
}

impl Cursor {
    fn hop(&self) -> Hop {
        let mut cursor = self.clone();
        loop {
            if let Some(server) = cursor.servers.get(cursor.index).cloned() {
                cursor.index += 1;
                return Hop::Server(server, cursor);
            }
            match cursor.parent.take() {
                Some(parent) => cursor = (*parent).clone(),
                None => return Hop::Tail(cursor.tail),
            }
        }
    }
}

/// Per-call context passed through a chain
///
/// Cloning is cheap. Servers receive it by reference and must not keep it
/// after the call returns.
#[derive(Clone, Default)]
pub struct Context {
    cursor: Option<Cursor>,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this context that carries a deadline
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline has passed. Servers doing I/O should check this;
    /// the chain itself only carries it.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn with_cursor(&self, cursor: Option<Cursor>) -> Self {
        Self {
            cursor,
            deadline: self.deadline,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("index", &self.cursor.as_ref().map(|c| c.index))
            .field("len", &self.cursor.as_ref().map(|c| c.servers.len()))
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Return a copy of `ctx` whose cursor points at the start of `servers`.
///
/// If `ctx` is already inside a chain, that chain resumes after `servers` is
/// exhausted. Otherwise the call ends at [`TailServer`].
pub fn with_next_server(ctx: &Context, servers: Arc<[Server]>) -> Context {
    with_chain(ctx, servers, Arc::new(TailServer))
}

fn with_chain(ctx: &Context, servers: Arc<[Server]>, tail: Server) -> Context {
    ctx.with_cursor(Some(Cursor {
        servers,
        index: 0,
        parent: ctx.cursor.clone().map(Arc::new),
        tail,
    }))
}

/// Server that continues the chain carried by `ctx`
pub fn next_server(ctx: &Context) -> Next {
    Next {
        cursor: ctx.cursor.clone(),
    }
}

/// Handle returned by [`next_server`]
pub struct Next {
    cursor: Option<Cursor>,
}

impl Next {
    fn hop(&self) -> Hop {
        match &self.cursor {
            Some(cursor) => cursor.hop(),
            None => Hop::Tail(Arc::new(TailServer)),
        }
    }
}

#[async_trait::async_trait]
impl NetworkServiceEndpointRegistryServer for Next {
    fn name(&self) -> &'static str {
        "Next"
    }

    async fn register(
        &self,
        ctx: &Context,
        nse: NetworkServiceEndpoint,
    ) -> Result<NetworkServiceEndpoint> {
        match self.hop() {
            Hop::Server(server, cursor) => {
                let span = debug_span!("server", name = server.name(), op = "register");
                let ctx = ctx.with_cursor(Some(cursor));
                server.register(&ctx, nse).instrument(span).await
            }
            Hop::Tail(tail) => tail.register(&ctx.with_cursor(None), nse).await,
        }
    }

    async fn unregister(&self, ctx: &Context, nse: NetworkServiceEndpoint) -> Result<()> {
        match self.hop() {
            Hop::Server(server, cursor) => {
                let span = debug_span!("server", name = server.name(), op = "unregister");
                let ctx = ctx.with_cursor(Some(cursor));
                server.unregister(&ctx, nse).instrument(span).await
            }
            Hop::Tail(tail) => tail.unregister(&ctx.with_cursor(None), nse).await,
        }
    }
}

/// End of every chain: accepts the endpoint as is
pub struct TailServer;

#[async_trait::async_trait]
impl NetworkServiceEndpointRegistryServer for TailServer {
    fn name(&self) -> &'static str {
        "TailServer"
    }

    async fn register(
        &self,
        _ctx: &Context,
        nse: NetworkServiceEndpoint,
    ) -> Result<NetworkServiceEndpoint> {
        Ok(nse)
    }

    async fn unregister(&self, _ctx: &Context, _nse: NetworkServiceEndpoint) -> Result<()> {
        Ok(())
    }
}

/// A chain of servers exposed as a single server.
///
/// Servers run in order on the way in and get control back in reverse
/// order. The first error any of them returns is passed back unchanged.
pub struct NextServer {
    servers: Arc<[Server]>,
    tail: Server,
}

/// Build a chain ending at [`TailServer`]
pub fn new_server(servers: Vec<Server>) -> NextServer {
    NextServer {
        servers: servers.into(),
        tail: Arc::new(TailServer),
    }
}

#[async_trait::async_trait]
impl NetworkServiceEndpointRegistryServer for NextServer {
    fn name(&self) -> &'static str {
        "NextServer"
    }

    async fn register(
        &self,
        ctx: &Context,
        nse: NetworkServiceEndpoint,
    ) -> Result<NetworkServiceEndpoint> {
        let ctx = with_chain(ctx, self.servers.clone(), self.tail.clone());
        next_server(&ctx).register(&ctx, nse).await
    }

    async fn unregister(&self, ctx: &Context, nse: NetworkServiceEndpoint) -> Result<()> {
        let ctx = with_chain(ctx, self.servers.clone(), self.tail.clone());
        next_server(&ctx).unregister(&ctx, nse).await
    }
}

/// Builder for [`NextServer`]
pub struct ChainBuilder {
    servers: Vec<Server>,
    tail: Server,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self {
            servers: Vec::new(),
            tail: Arc::new(TailServer),
        }
    }

    /// Append a server to the chain
    pub fn add<S: NetworkServiceEndpointRegistryServer + 'static>(self, server: S) -> Self {
        self.add_shared(Arc::new(server))
    }

    /// Append a server that is also referenced elsewhere
    pub fn add_shared(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }

    /// Server reached once the chain is exhausted and no enclosing chain
    /// remains. It is called with a context outside any chain.
    pub fn tail<S: NetworkServiceEndpointRegistryServer + 'static>(mut self, tail: S) -> Self {
        self.tail = Arc::new(tail);
        self
    }

    pub fn build(self) -> NextServer {
        NextServer {
            servers: self.servers.into(),
            tail: self.tail,
        }
    }
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records entry and exit around the call to next
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                label,
                log: log.clone(),
            }
        }

        fn push(&self, event: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.label, event));
        }
    }

    #[async_trait::async_trait]
    impl NetworkServiceEndpointRegistryServer for Recorder {
        async fn register(
            &self,
            ctx: &Context,
            nse: NetworkServiceEndpoint,
        ) -> Result<NetworkServiceEndpoint> {
            self.push("in");
            let result = next_server(ctx).register(ctx, nse).await;
            self.push("out");
            result
        }

        async fn unregister(&self, ctx: &Context, nse: NetworkServiceEndpoint) -> Result<()> {
            self.push("in");
            let result = next_server(ctx).unregister(ctx, nse).await;
            self.push("out");
            result
        }
    }

    /// Renames the endpoint, as a stand-in for a terminal handler
    struct Rename(&'static str);

    #[async_trait::async_trait]
    impl NetworkServiceEndpointRegistryServer for Rename {
        async fn register(
            &self,
            _ctx: &Context,
            mut nse: NetworkServiceEndpoint,
        ) -> Result<NetworkServiceEndpoint> {
            nse.name = self.0.to_string();
            Ok(nse)
        }

        async fn unregister(&self, _ctx: &Context, _nse: NetworkServiceEndpoint) -> Result<()> {
            Ok(())
        }
    }

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_chain_order() {
        let log = log();
        let chain = ChainBuilder::new()
            .add(Recorder::new("a", &log))
            .add(Recorder::new("b", &log))
            .add(Recorder::new("c", &log))
            .build();

        chain
            .register(&Context::new(), NetworkServiceEndpoint::new("nse", "tcp://0.0.0.0"))
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:in", "b:in", "c:in", "c:out", "b:out", "a:out"]
        );
    }

    #[tokio::test]
    async fn test_unregister_order() {
        let log = log();
        let chain = new_server(vec![
            Arc::new(Recorder::new("a", &log)) as Server,
            Arc::new(Recorder::new("b", &log)) as Server,
        ]);

        chain
            .unregister(&Context::new(), NetworkServiceEndpoint::new("nse", ""))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a:in", "b:in", "b:out", "a:out"]);
    }

    #[tokio::test]
    async fn test_empty_chain_returns_input() {
        let chain = ChainBuilder::default().build();
        let nse = NetworkServiceEndpoint::new("nse", "tcp://0.0.0.0");

        let result = chain.register(&Context::new(), nse.clone()).await.unwrap();
        assert_eq!(result, nse);
    }

    #[tokio::test]
    async fn test_custom_tail() {
        let log = log();
        let chain = ChainBuilder::new()
            .add(Recorder::new("a", &log))
            .tail(Rename("tail"))
            .build();

        let result = chain
            .register(&Context::new(), NetworkServiceEndpoint::new("nse", ""))
            .await
            .unwrap();
        assert_eq!(result.name, "tail");
    }

    #[tokio::test]
    async fn test_next_server_outside_chain_is_tail() {
        let ctx = Context::new();
        let nse = NetworkServiceEndpoint::new("nse", "");

        let result = next_server(&ctx).register(&ctx, nse.clone()).await.unwrap();
        assert_eq!(result, nse);
        assert!(next_server(&ctx).unregister(&ctx, nse).await.is_ok());
    }

    #[tokio::test]
    async fn test_with_next_server_leaves_input_untouched() {
        let ctx = Context::new();
        let servers: Arc<[Server]> = vec![Arc::new(Rename("renamed")) as Server].into();
        let chained = with_next_server(&ctx, servers);

        let nse = NetworkServiceEndpoint::new("nse", "");
        let result = next_server(&chained).register(&chained, nse.clone()).await.unwrap();
        assert_eq!(result.name, "renamed");

        let result = next_server(&ctx).register(&ctx, nse).await.unwrap();
        assert_eq!(result.name, "nse");
    }

    #[tokio::test]
    async fn test_nested_chain_resumes_outer() {
        let log = log();
        let inner = new_server(vec![
            Arc::new(Recorder::new("inner-a", &log)) as Server,
            Arc::new(Recorder::new("inner-b", &log)) as Server,
        ]);
        let outer = ChainBuilder::new()
            .add(Recorder::new("outer-a", &log))
            .add(inner)
            .add(Recorder::new("outer-b", &log))
            .tail(Rename("done"))
            .build();

        let result = outer
            .register(&Context::new(), NetworkServiceEndpoint::new("nse", ""))
            .await
            .unwrap();

        assert_eq!(result.name, "done");
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "outer-a:in",
                "inner-a:in",
                "inner-b:in",
                "outer-b:in",
                "outer-b:out",
                "inner-b:out",
                "inner-a:out",
                "outer-a:out",
            ]
        );
    }

    #[test]
    fn test_context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_expired());

        let expired = ctx.with_deadline(Instant::now());
        assert!(expired.is_expired());
        assert!(ctx.deadline().is_none());
    }
}
