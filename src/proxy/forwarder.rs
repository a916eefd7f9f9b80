//! Upstream forwarding
//!
//! Sends the request to the resolved upstream target and streams the answer
//! back. Both bodies pass through exactly once, chunk by chunk; nothing is
//! buffered in memory.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Response};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::redirect;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::{
    headers::{build_upstream_headers, sanitize_response_headers},
    logging::RequestContext,
    rewrite::UrlRewriter,
    target::UpstreamTarget,
};
use crate::{
    error::{AppError, AppResult},
    routes::metrics::record_upstream_error,
};

/// Client for all upstream provider calls
pub struct UpstreamForwarder {
    client: reqwest::Client,
    timeout: Duration,
    rewriter: Arc<dyn UrlRewriter>,
}

enum StreamStep {
    Chunk(Option<Result<Bytes, reqwest::Error>>),
    TimedOut,
}

impl UpstreamForwarder {
    /// Create a new forwarder
    pub fn new(client: reqwest::Client, timeout: Duration, rewriter: Arc<dyn UrlRewriter>) -> Self {
        Self {
            client,
            timeout,
            rewriter,
        }
    }

    /// HTTP client with connection pooling that never follows redirects
    pub fn build_client() -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .redirect(redirect::Policy::none())
            .build()
    }

    /// Forward a request to the upstream target.
    ///
    /// The deadline covers the whole exchange: if it passes before the
    /// response head arrives the call fails with `UpstreamTimeout`; if it
    /// passes while streaming, the response body errors out and the client
    /// connection is torn down.
    #[instrument(skip_all, fields(trace_id = %ctx.trace_id, provider = %ctx.provider, method = %method))]
    pub async fn forward(
        &self,
        ctx: &RequestContext,
        method: Method,
        incoming_headers: &HeaderMap,
        body: Body,
        target: &UpstreamTarget,
    ) -> AppResult<Response<Body>> {
        let deadline = Instant::now() + self.timeout;
        let url = self.rewriter.rewrite(target.url());

        let headers = build_upstream_headers(
            ctx.provider,
            &target.auth_header_name,
            &target.auth_value,
            incoming_headers,
        )?;

        ctx.log_upstream_request(&url);

        let mut request_builder = self.client.request(method.clone(), &url).headers(headers);

        // Only add body for methods that support it; the stream is consumed once
        if method != Method::GET && method != Method::HEAD {
            let data_stream = body
                .into_data_stream()
                .map(|chunk| chunk.map_err(|e| io::Error::other(e.to_string())));
            request_builder = request_builder.body(reqwest::Body::wrap_stream(data_stream));
        }

        let response = match tokio::time::timeout_at(deadline, request_builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(self.send_error(ctx, &url, e)),
            Err(_) => {
                ctx.log_timeout(self.timeout_ms());
                record_upstream_error(ctx.provider.as_str(), "timeout");
                return Err(AppError::UpstreamTimeout(self.timeout_ms()));
            }
        };

        ctx.log_upstream_response(response.status().as_u16(), response.content_length());

        Ok(self.convert_response(ctx.clone(), response, deadline))
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    fn send_error(&self, ctx: &RequestContext, url: &str, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            ctx.log_timeout(self.timeout_ms());
            record_upstream_error(ctx.provider.as_str(), "timeout");
            return AppError::UpstreamTimeout(self.timeout_ms());
        }

        ctx.log_connection_error(&e.to_string(), url);
        record_upstream_error(ctx.provider.as_str(), "connect");
        AppError::UpstreamError(format!("{} ({})", e, error_chain(&e)))
    }

    /// Convert the upstream response into a client response with a live body
    fn convert_response(
        &self,
        ctx: RequestContext,
        response: reqwest::Response,
        deadline: Instant,
    ) -> Response<Body> {
        let status = response.status();
        let headers = sanitize_response_headers(ctx.provider, response.headers());
        let timeout_ms = self.timeout_ms();

        debug!(
            trace_id = %ctx.trace_id,
            status = %status,
            header_count = %headers.len(),
            "Relaying upstream response"
        );

        let body = async_stream::stream! {
            let mut upstream = response.bytes_stream();
            let sleep = tokio::time::sleep_until(deadline);
            tokio::pin!(sleep);

            let mut chunks = 0usize;
            let mut bytes = 0usize;

            loop {
                let step = tokio::select! {
                    biased;
                    chunk = upstream.next() => StreamStep::Chunk(chunk),
                    _ = &mut sleep => StreamStep::TimedOut,
                };

                match step {
                    StreamStep::Chunk(Some(Ok(chunk))) => {
                        chunks += 1;
                        bytes += chunk.len();
                        yield Ok(chunk);
                    }
                    StreamStep::Chunk(Some(Err(e))) => {
                        ctx.log_error(&e.to_string());
                        record_upstream_error(ctx.provider.as_str(), "stream");
                        yield Err(io::Error::other(e));
                        break;
                    }
                    StreamStep::Chunk(None) => {
                        ctx.log_stream_ended(chunks, bytes);
                        break;
                    }
                    StreamStep::TimedOut => {
                        ctx.log_timeout(timeout_ms);
                        record_upstream_error(ctx.provider.as_str(), "timeout");
                        yield Err(io::Error::new(io::ErrorKind::TimedOut, "upstream response timed out"));
                        break;
                    }
                }
            }
        };

        let mut client_response = Response::new(Body::from_stream(body));
        *client_response.status_mut() = status;
        *client_response.headers_mut() = headers;
        client_response
    }
}

/// Flatten an error's source chain into one line
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut source = e.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    if parts.is_empty() {
        "no further detail".to_string()
    } else {
        parts.join(": ")
    }
}
