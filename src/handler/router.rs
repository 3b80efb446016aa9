//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: classifies the request as API or
//! static, reads the body once for API requests, and writes the access log.

use crate::api::{self, route, ApiResponse, RequestContext};
use crate::config::AppState;
use crate::handler::static_files::{self, StaticRequest};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::HeaderMap;
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let entry = state
        .access_log()
        .then(|| AccessLogEntry::from_parts(peer_addr, &parts));

    let response = route_request(&parts, body, &state).await;

    if let Some(mut entry) = entry {
        let body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Non-API reads go to the static responder; everything else is an API request
async fn route_request(parts: &Parts, body: Incoming, state: &AppState) -> Response<Full<Bytes>> {
    let path = parts.uri.path();
    let prefix = state.config.api.prefix.as_str();
    let is_read = matches!(parts.method, Method::GET | Method::HEAD);

    if is_read && !route::is_api_request(path, prefix) {
        let req = StaticRequest {
            path,
            is_head: parts.method == Method::HEAD,
            if_none_match: header_str(&parts.headers, "if-none-match"),
        };
        return static_files::serve(&req, &state.config).await;
    }

    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&parts.headers, max_body_size) {
        return resp;
    }

    let server_name = state.config.http.server_name.as_str();
    let body = match read_body(body, max_body_size, server_name).await {
        Ok(bytes) => bytes,
        Err(resp) => return resp,
    };

    let ctx = RequestContext::new(
        parts.method.clone(),
        path,
        header_str(&parts.headers, "content-type").map(ToString::to_string),
        body,
    );
    api::dispatch(&ctx, &state.store, prefix)
        .await
        .into_http(server_name)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size_str = header_str(headers, "content-length")?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', reading body as sent"
            ));
            None
        }
        _ => None,
    }
}

/// Read the whole body once, bounded by `max_body_size`
async fn read_body(
    body: Incoming,
    max_body_size: u64,
    server_name: &str,
) -> Result<Bytes, Response<Full<Bytes>>> {
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_error(&format!("Request body exceeded {max_body_size} bytes"));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(ApiResponse::invalid_content_type().into_http(server_name))
        }
    }
}
