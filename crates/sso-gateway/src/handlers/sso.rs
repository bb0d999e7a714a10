//! SSO handshake endpoints.
//!
//! `GET /discourse_sso` is where the forum sends the browser; it answers with a
//! `303 See Other` back to the forum. `GET /api/v1/discourse_sso` does the same
//! work for single-page clients and returns the target as JSON instead.

use crate::domain::error::ApiError;
use crate::service::AppState;
use crate::session::extract_token;
use axum::{
    extract::{OriginalUri, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sso_core::{SsoError, SsoHandshakeApi, SsoRedirect};
use sso_telemetry::{HistogramTimer, HANDSHAKES, HANDSHAKE_DURATION};
use tracing::{info, warn};
use url::Url;

/// Query parameters sent by the forum.
#[derive(Debug, Deserialize)]
pub struct SsoQuery {
    pub sso: Option<String>,
    pub sig: Option<String>,
}

/// Body of the REST variant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnUrl {
    pub return_url: String,
}

/// Resolves the session, runs the handshake and records the outcome.
async fn run_handshake(
    state: &AppState,
    headers: &HeaderMap,
    query: &SsoQuery,
) -> Result<SsoRedirect, SsoError> {
    let _timer = HistogramTimer::new(&HANDSHAKE_DURATION);

    let result = match (query.sso.as_deref(), query.sig.as_deref()) {
        (Some(sso), Some(sig)) => {
            let token = extract_token(headers);
            let user = state.handshake.resolve_user(token.as_deref()).await;
            state.handshake.complete(sso, sig, user.as_ref())
        }
        _ => Err(SsoError::malformed("missing sso or sig parameter")),
    };

    match &result {
        Ok(_) => {
            HANDSHAKES.with_label_values(&["success"]).inc();
            info!("SSO handshake succeeded");
        }
        Err(err) => {
            HANDSHAKES.with_label_values(&[err.label()]).inc();
            match err {
                SsoError::MalformedPayload { reason } => {
                    warn!(outcome = err.label(), reason = *reason, "SSO handshake rejected")
                }
                _ => warn!(outcome = err.label(), "SSO handshake rejected"),
            }
        }
    }

    result
}

/// `303 See Other` to `location`.
fn see_other(location: &str) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(location)
        .map_err(|_| ApiError::internal("Redirect target is not a valid header value."))?;
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response())
}

/// The login page with `next` pointing back at this request.
fn login_redirect(login_url: &str, original: &OriginalUri) -> Result<Response, ApiError> {
    let mut url =
        Url::parse(login_url).map_err(|_| ApiError::internal("Login URL is misconfigured."))?;
    let next = original
        .0
        .path_and_query()
        .map_or_else(|| original.0.path().to_string(), |pq| pq.as_str().to_string());
    url.query_pairs_mut().append_pair("next", &next);
    see_other(url.as_str())
}

/// `GET /discourse_sso`
pub async fn sso_redirect(
    State(state): State<AppState>,
    original: OriginalUri,
    headers: HeaderMap,
    Query(query): Query<SsoQuery>,
) -> Result<Response, ApiError> {
    match run_handshake(&state, &headers, &query).await {
        Ok(redirect) => see_other(&redirect.location),
        Err(SsoError::NotAuthenticated) => match &state.config.handshake.login_url {
            Some(login_url) => login_redirect(login_url, &original),
            None => Err(ApiError::from(SsoError::NotAuthenticated)),
        },
        Err(err) => Err(err.into()),
    }
}

/// `GET /api/v1/discourse_sso`
pub async fn sso_return_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SsoQuery>,
) -> Result<Json<ReturnUrl>, ApiError> {
    let redirect = run_handshake(&state, &headers, &query).await?;
    Ok(Json(ReturnUrl {
        return_url: redirect.location,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    #[test]
    fn test_login_redirect_carries_next() {
        let original = OriginalUri(Uri::from_static("/discourse_sso?sso=abc%3D&sig=00"));
        let response = login_redirect("https://archive.example/login", &original).unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        let url = Url::parse(location).unwrap();
        let next = url
            .query_pairs()
            .find(|(k, _)| k == "next")
            .map(|(_, v)| v.into_owned());
        assert_eq!(next.as_deref(), Some("/discourse_sso?sso=abc%3D&sig=00"));
    }

    #[test]
    fn test_return_url_body() {
        let body = serde_json::to_value(ReturnUrl {
            return_url: "https://forum.example/session/sso_login?sso=x&sig=y".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"returnUrl": "https://forum.example/session/sso_login?sso=x&sig=y"})
        );
    }
}
