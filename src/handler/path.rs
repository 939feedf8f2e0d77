//! Request path translation
//!
//! Maps a URI path onto a path relative to the site root. Resolution is
//! purely lexical: `..` can pop components gained earlier in the same
//! request path but never climb above the root.

use percent_encoding::percent_decode_str;
use std::path::PathBuf;

/// A request path after decoding and normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    /// Decoded path as requested, for display (listing titles, logs)
    pub decoded: String,
    /// Root-relative path; empty means the root itself
    pub relative: PathBuf,
    /// The request asked for a directory (`/docs/` rather than `/docs`)
    pub trailing_slash: bool,
}

impl RequestPath {
    /// Translate the path component of a request URI
    pub fn translate(uri_path: &str) -> Self {
        let decoded = percent_decode_str(uri_path).decode_utf8_lossy().into_owned();
        let trailing_slash = decoded.trim_end().ends_with('/');

        let mut components: Vec<&str> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                s if s.contains(['\\', '\0']) => {}
                s => components.push(s),
            }
        }

        Self {
            relative: components.iter().collect(),
            decoded,
            trailing_slash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_plain_path() {
        let p = RequestPath::translate("/demo/streaming.html");
        assert_eq!(p.relative, Path::new("demo/streaming.html"));
        assert!(!p.trailing_slash);
    }

    #[test]
    fn test_root_and_trailing_slash() {
        let root = RequestPath::translate("/");
        assert_eq!(root.relative, PathBuf::new());
        assert!(root.trailing_slash);

        let dir = RequestPath::translate("/demo/");
        assert_eq!(dir.relative, Path::new("demo"));
        assert!(dir.trailing_slash);
    }

    #[test]
    fn test_percent_decoding() {
        let p = RequestPath::translate("/my%20file.txt");
        assert_eq!(p.relative, Path::new("my file.txt"));
        assert_eq!(p.decoded, "/my file.txt");
    }

    #[test]
    fn test_traversal_cannot_leave_root() {
        assert_eq!(RequestPath::translate("/../etc/passwd").relative, Path::new("etc/passwd"));
        assert_eq!(
            RequestPath::translate("/%2e%2e/%2E%2E/secret").relative,
            Path::new("secret")
        );
        assert_eq!(RequestPath::translate("/a/b/../../../c").relative, Path::new("c"));
        assert_eq!(RequestPath::translate("/a/./b/../c").relative, Path::new("a/c"));
    }

    #[test]
    fn test_suspicious_segments_dropped() {
        assert_eq!(
            RequestPath::translate("/..%5c..%5cwindows/x").relative,
            Path::new("x")
        );
        assert_eq!(RequestPath::translate("/a%00b/c").relative, Path::new("c"));
    }
}
