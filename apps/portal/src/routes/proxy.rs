//! Backend pass-through for every `/api/*` path the portal does not serve
//! itself. Only the headers the assessment needs cross the boundary.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderName, Method},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

/// Resume uploads are capped at 5MB client-side; leave room for multipart framing.
pub const PROXY_BODY_LIMIT: usize = 8 * 1024 * 1024;

const FORWARDED_REQUEST_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::COOKIE,
    header::ACCEPT,
    header::AUTHORIZATION,
];

const FORWARDED_RESPONSE_HEADERS: [HeaderName; 2] = [header::CONTENT_TYPE, header::SET_COOKIE];

/// ANY /api/*path
pub async fn handle_proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let mut url = format!("{}/{}", state.config.api_url, path);
    if let Some(query) = query {
        url.push('?');
        url.push_str(&query);
    }
    debug!(%method, %url, "Forwarding request to backend");

    let mut request = state.http.request(method, &url).body(body);
    for name in FORWARDED_REQUEST_HEADERS {
        for value in headers.get_all(&name) {
            request = request.header(name.clone(), value.clone());
        }
    }

    let upstream = request
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("{url}: {e}")))?;

    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    for name in FORWARDED_RESPONSE_HEADERS {
        for value in upstream.headers().get_all(&name) {
            response_headers.append(name.clone(), value.clone());
        }
    }

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| AppError::Upstream(format!("{url}: {e}")))?;

    Ok((status, response_headers, bytes).into_response())
}
