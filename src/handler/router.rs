//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, static file
//! resolution, isolation headers and access logging.

use crate::config::AppState;
use crate::handler::path::RequestPath;
use crate::handler::static_files;
use crate::http::{self, isolation};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, SERVER};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Raw URI path, still percent-encoded
    pub uri_path: &'a str,
    pub query: Option<&'a str>,
    pub path: RequestPath,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// Main entry point for HTTP request handling
///
/// Never fails: every outcome, including errors, is an HTTP response that
/// carries the cross-origin isolation headers. Requests hyper rejects while
/// parsing (e.g. a 400 for a malformed header line) are answered by hyper
/// without reaching this function, so those responses have no isolation
/// headers.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    // GET/HEAD bodies are never read
    let (parts, _) = req.into_parts();

    let mut entry = state.access_log_enabled().then(|| {
        AccessLogEntry::from_request(
            peer_addr,
            &parts.method,
            &parts.uri,
            parts.version,
            &parts.headers,
        )
    });

    logger::log_headers_count(parts.headers.len(), state.config.logging.show_headers);

    let response = dispatch(&parts, &state).await;
    let response = finalize(response, &state);

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch(parts: &Parts, state: &AppState) -> Response<Full<Bytes>> {
    if let Some(resp) = check_http_method(&parts.method) {
        return resp;
    }

    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let uri = &parts.uri;
    let ctx = RequestContext {
        uri_path: uri.path(),
        query: uri.query(),
        path: RequestPath::translate(uri.path()),
        is_head: parts.method == Method::HEAD,
        if_none_match: header(IF_NONE_MATCH),
        if_modified_since: header(IF_MODIFIED_SINCE),
    };
    logger::log_debug(&format!(
        "{} {} -> {}",
        parts.method,
        ctx.path.decoded,
        state.root.join(&ctx.path.relative).display()
    ));

    static_files::serve_path(&ctx, state).await
}

/// Only GET and HEAD are served; everything else gets 501
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Unsupported method: {method}"));
            Some(http::build_501_response())
        }
    }
}

/// Last step before hyper serialises the headers
fn finalize(response: Response<Full<Bytes>>, state: &AppState) -> Response<Full<Bytes>> {
    let mut response = isolation::apply(response);
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }
    response
}
