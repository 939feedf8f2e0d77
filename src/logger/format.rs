//! Access log format module
//!
//! Supports multiple log formats:
//! - `common` (Common Log Format, the default)
//! - `combined` (common plus referer and user agent)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variables`

use chrono::Local;
use hyper::{HeaderMap, Method, Uri, Version};
use std::net::SocketAddr;

/// One served request, as written to the access log
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: chrono::DateTime<Local>,
    pub method: String,
    /// Path and query exactly as requested
    pub uri: String,
    /// HTTP version (1.0, 1.1, 2)
    pub http_version: &'static str,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Handling time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Capture the request side of an entry; status and size are filled in later
    pub fn from_request(
        peer: SocketAddr,
        method: &Method,
        uri: &Uri,
        version: Version,
        headers: &HeaderMap,
    ) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            remote_addr: peer.ip().to_string(),
            time: Local::now(),
            method: method.to_string(),
            uri: uri
                .path_and_query()
                .map_or_else(|| uri.path().to_string(), ToString::to_string),
            http_version: version_str(version),
            status: 200,
            body_bytes: 0,
            referer: header("referer"),
            user_agent: header("user-agent"),
            request_time_us: 0,
        }
    }

    /// Format the entry according to the configured format name or pattern
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.uri, self.http_version)
    }

    fn time_local(&self) -> String {
        self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time_local(),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        let opt = |v: Option<&String>| {
            v.map_or_else(|| "null".to_string(), |s| format!("\"{}\"", escape_json(s)))
        };

        format!(
            r#"{{"remote_addr":"{}","time":"{}","method":"{}","uri":"{}","http_version":"{}","status":{},"body_bytes":{},"referer":{},"user_agent":{},"request_time_us":{}}}"#,
            escape_json(&self.remote_addr),
            self.time.to_rfc3339(),
            escape_json(&self.method),
            escape_json(&self.uri),
            self.http_version,
            self.status,
            self.body_bytes,
            opt(self.referer.as_ref()),
            opt(self.user_agent.as_ref()),
            self.request_time_us,
        )
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables: `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$request_time`
    /// (seconds, 3 decimals), `$status`, `$body_bytes_sent`,
    /// `$http_referer`, `$http_user_agent`.
    ///
    /// The pattern is scanned once; substituted values are copied verbatim,
    /// so a `$name` sent by the client is never expanded.
    fn format_custom(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            // Longest name wins: $request_time over $request
            let name = CUSTOM_VARIABLES
                .iter()
                .copied()
                .filter(|name| rest.starts_with(name))
                .max_by_key(|name| name.len());
            match name {
                Some(name) => {
                    out.push_str(&self.variable(name));
                    rest = &rest[name.len()..];
                }
                None => {
                    out.push('$');
                    rest = &rest[1..];
                }
            }
        }

        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> String {
        match name {
            "$remote_addr" => self.remote_addr.clone(),
            "$time_local" => self.time_local(),
            "$time_iso8601" => self.time.to_rfc3339(),
            "$request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let seconds = self.request_time_us as f64 / 1_000_000.0;
                format!("{seconds:.3}")
            }
            "$request_method" => self.method.clone(),
            "$request_uri" => self.uri.clone(),
            "$request" => self.request_line(),
            "$status" => self.status.to_string(),
            "$body_bytes_sent" => self.body_bytes.to_string(),
            "$http_referer" => self.referer.clone().unwrap_or_else(|| "-".into()),
            "$http_user_agent" => self.user_agent.clone().unwrap_or_else(|| "-".into()),
            _ => String::new(),
        }
    }
}

/// Variables understood by custom access log patterns
const CUSTOM_VARIABLES: [&str; 11] = [
    "$remote_addr",
    "$time_local",
    "$time_iso8601",
    "$request_time",
    "$request_method",
    "$request_uri",
    "$request",
    "$status",
    "$body_bytes_sent",
    "$http_referer",
    "$http_user_agent",
];

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

/// Escape special characters for JSON string
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, USER_AGENT};

    fn create_test_entry() -> AccessLogEntry {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        let uri: Uri = "/demo/streaming.html?v=2".parse().unwrap();

        let mut entry = AccessLogEntry::from_request(
            "192.168.1.1:50000".parse().unwrap(),
            &Method::GET,
            &uri,
            Version::HTTP_11,
            &headers,
        );
        entry.status = 200;
        entry.body_bytes = 1234;
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn test_from_request() {
        let entry = create_test_entry();
        assert_eq!(entry.remote_addr, "192.168.1.1");
        assert_eq!(entry.uri, "/demo/streaming.html?v=2");
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert!(entry.referer.is_none());
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"GET /demo/streaming.html?v=2 HTTP/1.1\" 200 1234"));
        assert!(!log.contains("Mozilla"));
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.contains("200 1234 \"-\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        assert!(log.contains(r#""remote_addr":"192.168.1.1""#));
        assert!(log.contains(r#""status":200"#));
        assert!(log.contains(r#""referer":null"#));
        assert!(log.contains(r#""user_agent":"Mozilla/5.0""#));
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry().format("$request_method $request_uri -> $status in $request_time");
        // 1500us = 0.0015s, formatted with 3 decimals
        assert!(log.starts_with("GET /demo/streaming.html?v=2 -> 200 in 0.00"), "got: {log}");
    }

    #[test]
    fn test_format_custom_does_not_expand_client_values() {
        let mut entry = create_test_entry();
        entry.uri = "/a$status".to_string();
        entry.user_agent = Some("curl $request_uri $$".to_string());
        entry.status = 404;

        assert_eq!(entry.format("\"$request_uri\""), "\"/a$status\"");
        assert_eq!(
            entry.format("$status $http_user_agent"),
            "404 curl $request_uri $$"
        );
    }

    #[test]
    fn test_format_custom_keeps_unknown_and_trailing_dollars() {
        let entry = create_test_entry();
        assert_eq!(entry.format("$unknown $status$"), "$unknown 200$");
    }
}
