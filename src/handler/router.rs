//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: path validation, dispatch to the
//! page operations, access logging.

use crate::config::AppState;
use crate::handler::wiki;
use crate::http::{self, FormSource};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, Operation, PageRoute};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Form field holding the page body on save
const BODY_FIELD: &str = "body";

/// Main entry point for HTTP request handling
///
/// Operations are method-agnostic; `HEAD` only suppresses the response body.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let path = routing::decode_path(parts.uri.path());
    let route = path.as_deref().and_then(routing::match_path);

    let response = match &route {
        // Unrecognized paths never reach the store
        None => http::build_404_response(),
        Some(route) => dispatch(&parts, body, route, &state).await,
    };
    let response = http::with_server_header(response, &state.config.http.server_name);

    if state.access_log_enabled() {
        let entry = access_entry(&parts, route.as_ref(), &response, peer_addr, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(response)
}

/// Run the operation a validated path names
async fn dispatch<B>(
    parts: &Parts,
    body: B,
    route: &PageRoute<'_>,
    state: &AppState,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let is_head = parts.method == Method::HEAD;
    match route.operation {
        Operation::View => wiki::view(state, route.title, is_head).await,
        Operation::Edit => wiki::edit(state, route.title, is_head).await,
        Operation::Save => {
            let max_body_size = state.config.http.max_body_size;
            if let Some(resp) = check_body_size(&parts.headers, max_body_size) {
                return resp;
            }
            let bytes = match read_body(body, max_body_size).await {
                Ok(bytes) => bytes,
                Err(resp) => return resp,
            };

            let source = FormSource {
                method: &parts.method,
                content_type: header_str(&parts.headers, "content-type"),
                query: parts.uri.query(),
                body: &bytes,
            };
            let page_body = http::form_value(&source, BODY_FIELD).unwrap_or_default();
            wiki::save(state, route.title, page_body).await
        }
    }
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
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
        _ => None,
    }
}

/// Collect the request body, enforcing the size limit while reading
async fn read_body<B>(body: B, max_body_size: u64) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_error(&format!("Request body exceeded {max_body_size} bytes"));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(http::build_400_response("Failed to read request body"))
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn access_entry(
    parts: &Parts,
    route: Option<&PageRoute<'_>>,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = format!("{:?}", parts.version)
        .trim_start_matches("HTTP/")
        .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header_str(&parts.headers, "referer").map(ToString::to_string);
    entry.user_agent = header_str(&parts.headers, "user-agent").map(ToString::to_string);
    if let Some(route) = route {
        entry.operation = Some(route.operation.to_string());
        entry.title = Some(route.title.to_string());
    }
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}
