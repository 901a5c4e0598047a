use super::{HttpBody, HttpTransport, ReqwestTransport, TransportResult};
use crate::error::DebuggerError;
use futures::future::BoxFuture;
use http::Request;
use std::sync::{Arc, PoisonError, RwLock};

/// A handler that may take over requests passing through a [`RequestRouter`].
pub trait UrlInterceptor: Send + Sync {
    /// Whether this interceptor wants to handle `request`.
    fn can_handle(&self, request: &Request<HttpBody>) -> bool;

    /// Perform a claimed request. `upstream` is the router itself, so any
    /// request re-issued through it is offered to the interceptors again.
    fn start_loading<'a>(
        &'a self,
        request: Request<HttpBody>,
        upstream: &'a dyn HttpTransport,
    ) -> BoxFuture<'a, TransportResult>;
}

/// Process-wide entry point for outbound HTTP.
///
/// Interceptors registered later are consulted first; a request nobody claims
/// goes straight to the base transport.
pub struct RequestRouter {
    interceptors: RwLock<Vec<Arc<dyn UrlInterceptor>>>,
    base: Arc<dyn HttpTransport>,
}

impl RequestRouter {
    pub fn new(base: Arc<dyn HttpTransport>) -> Self {
        Self {
            interceptors: RwLock::new(Vec::new()),
            base,
        }
    }

    /// Router backed by a [`ReqwestTransport`] with default settings.
    pub fn with_default_transport() -> Result<Self, DebuggerError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?)))
    }

    pub fn register_interceptor(&self, interceptor: Arc<dyn UrlInterceptor>) {
        let mut interceptors = self
            .interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        interceptors.push(interceptor);
        tracing::debug!("Interceptor registered ({} active)", interceptors.len());
    }

    /// Remove a previously registered interceptor. Returns `false` if it was
    /// not registered.
    pub fn unregister_interceptor(&self, interceptor: &Arc<dyn UrlInterceptor>) -> bool {
        let mut interceptors = self
            .interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let target = Arc::as_ptr(interceptor) as *const ();
        let before = interceptors.len();
        interceptors.retain(|existing| Arc::as_ptr(existing) as *const () != target);
        let removed = before != interceptors.len();
        if removed {
            tracing::debug!("Interceptor unregistered ({} active)", interceptors.len());
        }
        removed
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors
            .read()
            .map(|interceptors| interceptors.len())
            .unwrap_or(0)
    }

    fn claim(&self, request: &Request<HttpBody>) -> Option<Arc<dyn UrlInterceptor>> {
        let interceptors = self
            .interceptors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        interceptors
            .iter()
            .rev()
            .find(|interceptor| interceptor.can_handle(request))
            .cloned()
    }
}

impl HttpTransport for RequestRouter {
    fn send(&self, request: Request<HttpBody>) -> BoxFuture<'_, TransportResult> {
        match self.claim(&request) {
            Some(interceptor) => {
                Box::pin(async move { interceptor.start_loading(request, self).await })
            }
            None => self.base.send(request),
        }
    }
}
