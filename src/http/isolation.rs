//! Cross-origin isolation headers
//!
//! Browsers only expose `SharedArrayBuffer` to pages that are cross-origin
//! isolated, which requires both headers below on the document and on the
//! resources it loads.

use hyper::header::{HeaderName, HeaderValue};
use hyper::Response;

pub const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");
pub const CROSS_ORIGIN_EMBEDDER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-embedder-policy");

/// Header pairs added to every response
pub const ISOLATION_HEADERS: [(HeaderName, HeaderValue); 2] = [
    (CROSS_ORIGIN_OPENER_POLICY, HeaderValue::from_static("same-origin")),
    (CROSS_ORIGIN_EMBEDDER_POLICY, HeaderValue::from_static("require-corp")),
];

/// Add the isolation headers to a finished response, whatever its status
///
/// Existing values are replaced so each header appears exactly once.
pub fn apply<B>(mut response: Response<B>) -> Response<B> {
    let headers = response.headers_mut();
    for (name, value) in ISOLATION_HEADERS {
        headers.insert(name, value);
    }
    response
}
