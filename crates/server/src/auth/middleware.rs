use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use super::AdminAuth;
use crate::error::ServerError;

/// Tower layer guarding admin routes with a bearer token.
#[derive(Clone)]
pub struct AdminAuthLayer {
    auth: Arc<AdminAuth>,
}

impl AdminAuthLayer {
    pub fn new(auth: Arc<AdminAuth>) -> Self {
        Self { auth }
    }
}

impl<S> Layer<S> for AdminAuthLayer {
    type Service = AdminAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminAuthMiddleware {
            inner,
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Rejects requests without a bearer token with 401 and requests with an
/// invalid or expired token with 403. Valid claims are placed in the request
/// extensions.
#[derive(Clone)]
pub struct AdminAuthMiddleware<S> {
    inner: S,
    auth: Arc<AdminAuth>,
}

impl<S> Service<Request<Body>> for AdminAuthMiddleware<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let auth = Arc::clone(&self.auth);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let token = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty());

            let Some(token) = token else {
                return Ok(
                    ServerError::Unauthorized("Access token required".to_owned()).into_response(),
                );
            };

            match auth.validate(token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    inner.call(req).await
                }
                Err(e) => {
                    tracing::debug!(error = %e, "rejected admin token");
                    Ok(
                        ServerError::Forbidden("Invalid or expired token".to_owned())
                            .into_response(),
                    )
                }
            }
        })
    }
}
