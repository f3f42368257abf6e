//! Session endpoint configuration.
//!
//! An [`Endpoint`] fixes where a session connects: the HTTP upgrade URL for
//! the stream transport, the host/port pair for the raw transport, an
//! optional proxy, and the worker pool the session's I/O runs on. It is
//! immutable for the lifetime of a session.
//!
//! Proxy addresses are resolved through a [`ProxyAuthenticator`] passed
//! explicitly per endpoint, never through process-global registration, so
//! sessions with different proxies can coexist in one process.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::{Result, TransportError};

/// Resolves a configured proxy to the socket address the session dials.
///
/// Credential handling lives behind this trait; the transport only consumes
/// the resolved address.
pub trait ProxyAuthenticator: Send + Sync {
    /// Resolve a proxy string (`host:port`) to a dialable address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnresolvedProxy`] if the string resolves
    /// to no address.
    fn resolve(&self, proxy: &str) -> Result<SocketAddr>;
}

/// Default authenticator: plain system DNS resolution, no credentials.
#[derive(Debug, Default)]
pub struct SystemAuthenticator;

impl ProxyAuthenticator for SystemAuthenticator {
    fn resolve(&self, proxy: &str) -> Result<SocketAddr> {
        proxy
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::UnresolvedProxy(proxy.to_string()))
    }
}

/// Where and how a session connects. Immutable once built.
#[derive(Clone)]
pub struct Endpoint {
    ws_url: String,
    host: String,
    port: u16,
    proxy: Option<String>,
    authenticator: Arc<dyn ProxyAuthenticator>,
    handle: Handle,
}

impl Endpoint {
    /// Create an endpoint bound to the current tokio runtime.
    ///
    /// `ws_url` is the upgrade URL for the stream transport; `host`/`port`
    /// address the raw transport.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime (see [`Handle::current`]).
    pub fn new(ws_url: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            ws_url: ws_url.into(),
            host: host.into(),
            port,
            proxy: None,
            authenticator: Arc::new(SystemAuthenticator),
            handle: Handle::current(),
        }
    }

    /// Route the stream transport through a proxy (`host:port`).
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Replace the proxy authenticator collaborator.
    pub fn authenticator(mut self, authenticator: Arc<dyn ProxyAuthenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Run the session's I/O tasks on a specific worker pool.
    pub fn worker_handle(mut self, handle: Handle) -> Self {
        self.handle = handle;
        self
    }

    /// The HTTP upgrade URL for the stream transport.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// The raw transport's fixed host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The raw transport's fixed port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The worker pool sessions spawn their read tasks on.
    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Resolve the configured proxy, if any, through the authenticator.
    pub(crate) fn resolve_proxy(&self) -> Result<Option<SocketAddr>> {
        match &self.proxy {
            Some(proxy) => self.authenticator.resolve(proxy).map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("ws_url", &self.ws_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("proxy", &self.proxy)
            .finish()
    }
}
