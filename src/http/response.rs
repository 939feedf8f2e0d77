//! HTTP response building module
//!
//! Provides builders for the responses the file server produces, decoupled
//! from path resolution.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, LOCATION,
};
use hyper::{Response, StatusCode};

use super::cache;

/// Validators attached to a served file
pub struct FileMeta<'a> {
    pub content_type: &'a str,
    pub etag: &'a str,
    pub last_modified: Option<&'a str>,
}

/// Build 200 response for a file, with cache validators
pub fn build_file_response(data: Bytes, meta: &FileMeta<'_>, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, meta.content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ETAG, meta.etag)
        .header(CACHE_CONTROL, cache::CACHE_CONTROL);
    if let Some(last_modified) = meta.last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build generic HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, content_length)
        .header(CACHE_CONTROL, cache::CACHE_CONTROL)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, last_modified: Option<&str>) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, cache::CACHE_CONTROL);
    if let Some(last_modified) = last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("304", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 301 redirect, used to add the trailing slash to directory URLs
pub fn build_301_response(location: &str) -> Response<Full<Bytes>> {
    // Location comes from the request URI, which hyper already validated,
    // but a percent-decoded path could still carry bytes a header can't
    let Ok(location) = HeaderValue::from_str(location) else {
        crate::logger::log_warning(&format!("Invalid redirect target: {location:?}"));
        return build_404_response();
    };

    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_plain_error(StatusCode::NOT_FOUND, "404 File not found")
}

/// Build 501 Not Implemented response for methods other than GET/HEAD
pub fn build_501_response() -> Response<Full<Bytes>> {
    let mut response = build_plain_error(StatusCode::NOT_IMPLEMENTED, "501 Unsupported method");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

fn build_plain_error(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, message.len())
        .body(Full::new(Bytes::from_static(message.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::from_static(message.as_bytes())))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::body::Body;

    #[test]
    fn test_head_keeps_length_but_drops_body() {
        let meta = FileMeta {
            content_type: "text/plain; charset=utf-8",
            etag: "\"1\"",
            last_modified: Some("Tue, 14 Nov 2023 22:13:20 GMT"),
        };
        let resp = build_file_response(Bytes::from_static(b"hello"), &meta, true);

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "5");
        assert_eq!(resp.headers()[LAST_MODIFIED], "Tue, 14 Nov 2023 22:13:20 GMT");
        assert_eq!(resp.headers()[CACHE_CONTROL], "no-cache");
        assert_eq!(resp.body().size_hint().exact(), Some(0));
    }

    #[test]
    fn test_304_and_listing_revalidate() {
        let not_modified = build_304_response("\"1\"", None);
        assert_eq!(not_modified.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(not_modified.headers()[CACHE_CONTROL], "no-cache");
        assert!(not_modified.headers().get(LAST_MODIFIED).is_none());

        let listing = build_html_response("<ul></ul>".to_string(), false);
        assert_eq!(listing.headers()[CACHE_CONTROL], "no-cache");
    }

    #[test]
    fn test_501_lists_allowed_methods() {
        let resp = build_501_response();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(resp.headers()[ALLOW], "GET, HEAD");
    }

    #[test]
    fn test_redirect_with_unencodable_target_falls_back_to_404() {
        assert_eq!(build_301_response("/a\nb/").status(), StatusCode::NOT_FOUND);
        assert_eq!(build_301_response("/docs/").headers()[LOCATION], "/docs/");
    }
}
