//! Directory listing module
//!
//! Renders an HTML index for directories that have no index file.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io;
use std::path::Path;
use tokio::fs;

/// Characters left as-is in listing links (RFC 3986 unreserved, plus `/`)
const LINK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// One directory entry as shown in the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    /// Target is a directory (symlinks followed)
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// Read the entries of `dir`, sorted case-insensitively by name
pub async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let is_symlink = entry.file_type().await?.is_symlink();
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|m| m.is_dir());
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

/// Render the listing page for `display_path` (the decoded request path)
pub fn render(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );

    for entry in entries {
        let mut link = entry.name.clone();
        let mut display = entry.name.clone();
        if entry.is_dir {
            link.push('/');
            display.push('/');
        }
        if entry.is_symlink {
            display.push('@');
        }
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            utf8_percent_encode(&link, LINK_ENCODE_SET),
            escape_html(&display)
        ));
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_dir: bool, is_symlink: bool) -> ListingEntry {
        ListingEntry {
            name: name.to_string(),
            is_dir,
            is_symlink,
        }
    }

    #[test]
    fn test_render_marks_dirs_and_links() {
        let html = render(
            "/demo/",
            &[entry("assets", true, false), entry("latest", false, true)],
        );
        assert!(html.contains("<title>Directory listing for /demo/</title>"));
        assert!(html.contains("<li><a href=\"assets/\">assets/</a></li>"));
        assert!(html.contains("<li><a href=\"latest\">latest@</a></li>"));
    }

    #[test]
    fn test_render_escapes_names() {
        let html = render("/<x>/", &[entry("a b&c.txt", false, false)]);
        assert!(html.contains("Directory listing for /&lt;x&gt;/"));
        assert!(html.contains("<a href=\"a%20b%26c.txt\">a b&amp;c.txt</a>"));
    }

    #[tokio::test]
    async fn test_read_entries_sorted_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("A.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();

        let entries = read_entries(dir.path()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A.txt", "b.txt", "c"]);
        assert!(entries[2].is_dir);
        assert!(!entries[0].is_dir);
    }
}
