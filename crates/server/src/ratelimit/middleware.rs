use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use super::limiter::{RateLimitExceeded, RateLimitResult, RateLimiter};
use crate::client_ip::client_ip;
use crate::error::ServerError;

pub const TOO_MANY_REQUESTS_MESSAGE: &str =
    "Too many requests from this IP, please try again later.";

/// Tower layer limiting requests per client IP.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Option<Arc<RateLimiter>>,
    trust_proxy: bool,
}

impl RateLimitLayer {
    /// `None` disables limiting.
    pub fn new(limiter: Option<Arc<RateLimiter>>, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
            trust_proxy: self.trust_proxy,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: Option<Arc<RateLimiter>>,
    trust_proxy: bool,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let trust_proxy = self.trust_proxy;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(limiter) = limiter else {
                return inner.call(req).await;
            };

            let ip = client_ip(&req, trust_proxy);
            match limiter.check(&ip) {
                Ok(result) => {
                    let response = inner.call(req).await?;
                    Ok(add_rate_limit_headers(response, &result))
                }
                Err(exceeded) => {
                    tracing::warn!(%ip, retry_after = exceeded.retry_after, "rate limit exceeded");
                    Ok(rate_limited_response(&exceeded, TOO_MANY_REQUESTS_MESSAGE))
                }
            }
        })
    }
}

/// Add `X-RateLimit-*` headers to an allowed response.
pub fn add_rate_limit_headers(response: Response, result: &RateLimitResult) -> Response {
    let (mut parts, body) = response.into_parts();
    parts.headers.insert("X-RateLimit-Limit", result.limit.into());
    parts
        .headers
        .insert("X-RateLimit-Remaining", result.remaining.into());
    parts
        .headers
        .insert("X-RateLimit-Reset", result.reset_after.into());
    Response::from_parts(parts, body)
}

/// 429 with `Retry-After` and a zero remaining count.
pub fn rate_limited_response(exceeded: &RateLimitExceeded, message: &str) -> Response {
    let mut response = ServerError::RateLimited {
        retry_after: exceeded.retry_after,
        message: message.to_owned(),
    }
    .into_response();
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", exceeded.limit.into());
    headers.insert("X-RateLimit-Remaining", 0u64.into());
    response
}
