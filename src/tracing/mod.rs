//! Request tracing support.
//!
//! Every inbound request is assigned a fresh trace id which is
//! (1) scoped to the request's task so any code on the call chain can read
//! it, (2) recorded on the request span, and (3) echoed back to the client
//! in the `X-Trace-Id` response header. The task-local scope ends with the
//! request future on every path, so a value can never leak into another
//! request handled by the same worker.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tower_http::classify::{SharedClassifier, StatusInRangeAsFailures};
use tower_http::trace::{MakeSpan, TraceLayer};
use uuid::Uuid;

/// Header carrying the trace id on every response.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Opaque token identifying one request end-to-end across logs and responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(value: impl Into<String>) -> Self {
        TraceId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        TraceId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped context visible to all code on the request's call chain.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub trace_id: TraceId,
    pub path: String,
}

tokio::task_local! {
    static CURRENT_CONTEXT: RefCell<Option<RequestContext>>;
}

/// Runs `future` with `context` installed as the current request context.
pub async fn scope_request_context<Fut, R>(context: RequestContext, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_CONTEXT
        .scope(RefCell::new(Some(context)), future)
        .await
}

/// Returns the context of the request currently being handled, if any.
pub fn current_context() -> Option<RequestContext> {
    CURRENT_CONTEXT
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Returns the trace id of the request currently being handled, if any.
pub fn current_trace_id() -> Option<TraceId> {
    current_context().map(|ctx| ctx.trace_id)
}

/// Middleware assigning a fresh trace id to every request.
///
/// A new id is generated unconditionally; inbound headers are not trusted
/// as trace ids, since the token must be unique per request.
pub async fn trace_id_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = TraceId::default();
    let context = RequestContext {
        trace_id: trace_id.clone(),
        path: request.uri().path().to_string(),
    };

    // Expose the id to extractors and to the span maker.
    request.extensions_mut().insert(trace_id.clone());

    let mut response = scope_request_context(context, next.run(request)).await;

    // Trace ids are UUIDs and therefore always valid header values.
    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
    }

    response
}

/// Span maker attaching the trace id to the per-request span.
#[derive(Clone, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let trace_id = request
            .extensions()
            .get::<TraceId>()
            .cloned()
            .unwrap_or_default();

        tracing::info_span!(
            "http.request",
            trace_id = %trace_id,
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// HTTP tracing layer classifying 5xx responses as failures.
pub fn configure_http_tracing() -> TraceLayer<SharedClassifier<StatusInRangeAsFailures>, RequestSpanMaker>
{
    let classifier = SharedClassifier::new(StatusInRangeAsFailures::new(500..=599));
    TraceLayer::new(classifier).make_span_with(RequestSpanMaker)
}
