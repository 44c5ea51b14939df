use std::collections::HashSet;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response};
use tower::{Layer, Service};

use crate::gate::{AuthGate, credentials};
use crate::handlers::json_response::denial_response;

/// Tower layer for bearer-token authorization
///
/// Every request except those on an explicitly public path goes through
/// [`AuthGate::authorize`]. Allowed requests reach the inner service
/// untouched; denied ones get a JSON error with 401 or 403.
#[derive(Clone)]
pub struct AuthLayer {
    gate: AuthGate,
    public_paths: Arc<HashSet<String>>,
}

impl AuthLayer {
    pub fn new(gate: AuthGate) -> Self {
        Self {
            gate,
            public_paths: Arc::new(HashSet::new()),
        }
    }

    /// Exact paths that bypass the gate (health checks, login).
    pub fn with_public_paths<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.public_paths = Arc::new(paths.into_iter().collect());
        self
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            gate: self.gate.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

/// The actual service that performs authorization
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    gate: AuthGate,
    public_paths: Arc<HashSet<String>>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for AuthService<S>
where
    S: Service<Request<ReqBody>, Response = Response<BoxBody<Bytes, Infallible>>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();

        if self.public_paths.contains(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        // Owned copies so the future does not borrow the request.
        let path = req.uri().path().to_string();
        let authorization = credentials::authorization_header(req.headers()).cloned();
        let gate = self.gate.clone();

        Box::pin(async move {
            match gate.authorize(authorization.as_ref(), &path).await {
                Ok(_) => inner.call(req).await,
                Err(denial) => Ok(denial_response(denial)),
            }
        })
    }
}
