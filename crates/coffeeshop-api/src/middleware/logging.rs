//! Request span and logging middleware.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{field::Empty, info, info_span, warn, Instrument, Span};

use super::request_id::RequestId;

/// Layer that wraps each request in a span and logs its outcome.
#[derive(Clone, Default)]
pub struct RequestLoggingLayer;

impl RequestLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService { inner }
    }
}

/// Service that opens the `http_request` span and logs completion.
#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLoggingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let method = request.method().clone();
        // Path only: query strings are not logged.
        let path = request.uri().path().to_string();
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();

        let span = info_span!(
            "http_request",
            method = %method,
            path = %path,
            request_id = %request_id,
            status = Empty,
        );

        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let response = inner.call(request).await?;
                let status = response.status();
                let latency_ms = start.elapsed().as_millis() as u64;

                Span::current().record("status", status.as_u16());
                if status.is_server_error() {
                    warn!(
                        target: "coffeeshop::http",
                        status = status.as_u16(),
                        latency_ms,
                        "request failed"
                    );
                } else {
                    info!(
                        target: "coffeeshop::http",
                        status = status.as_u16(),
                        latency_ms,
                        "request completed"
                    );
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}
