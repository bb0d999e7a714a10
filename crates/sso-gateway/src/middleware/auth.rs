//! Admin authorization for the settings endpoints.
//!
//! A request passes when it carries the configured admin API key
//! (`Authorization: Bearer ..` or `X-API-Key`) or a session whose account is
//! an administrator.

use crate::domain::error::ApiError;
use crate::session::extract_token;
use axum::{
    body::Body,
    http::{HeaderMap, Request},
    response::{IntoResponse, Response},
};
use sso_core::SessionProvider;
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Authorization layer
#[derive(Clone)]
pub struct AdminAuthLayer {
    api_key: Option<Arc<str>>,
    sessions: Arc<dyn SessionProvider>,
}

impl AdminAuthLayer {
    pub fn new(api_key: Option<String>, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            api_key: api_key.map(Arc::from),
            sessions,
        }
    }
}

impl<S> Layer<S> for AdminAuthLayer {
    type Service = AdminAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminAuthService {
            inner,
            api_key: self.api_key.clone(),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// Authorization service
#[derive(Clone)]
pub struct AdminAuthService<S> {
    inner: S,
    api_key: Option<Arc<str>>,
    sessions: Arc<dyn SessionProvider>,
}

impl<S> Service<Request<Body>> for AdminAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let api_key = self.api_key.clone();
        let sessions = Arc::clone(&self.sessions);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if let Some(expected) = api_key.as_deref() {
                if check_api_key(req.headers(), expected) {
                    debug!("Admin request authorized by API key");
                    return inner.call(req).await;
                }
            }

            let user = match extract_token(req.headers()) {
                Some(token) => sessions.resolve(&token).await,
                None => None,
            };

            match user {
                Some(user) if user.admin => {
                    debug!(user_id = %user.id, "Admin request authorized by session");
                    inner.call(req).await
                }
                Some(user) => {
                    warn!(user_id = %user.id, "Settings access denied - not an administrator");
                    Ok(ApiError::forbidden().into_response())
                }
                None => {
                    warn!("Settings access denied - no credentials");
                    Ok(ApiError::unauthorized().into_response())
                }
            }
        })
    }
}

/// Check the API key from the request headers
fn check_api_key(headers: &HeaderMap, expected_key: &str) -> bool {
    // Check Authorization header (Bearer token)
    if let Some(auth) = headers.get("authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return constant_time_compare(token, expected_key);
            }
        }
    }

    // Check X-API-Key header
    if let Some(api_key) = headers.get("x-api-key") {
        if let Ok(key_str) = api_key.to_str() {
            return constant_time_compare(key_str, expected_key);
        }
    }

    false
}

/// Constant-time string comparison to prevent timing attacks
///
/// Both inputs are padded to the longer length with different fill bytes, so
/// a length difference cannot short-circuit the comparison.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}
