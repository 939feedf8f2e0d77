//! Static file serving module
//!
//! Resolves a translated request path against the site root and serves the
//! file, a directory index file, or a directory listing.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, FileMeta};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve whatever the request path names under the site root
pub async fn serve_path(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let root = match fs::canonicalize(&state.root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Site root not found or inaccessible '{}': {e}",
                state.root.display()
            ));
            return http::build_404_response();
        }
    };

    // Missing entries are the common 404 case, no need to warn
    let Some(target) = resolve_within(&root, &root.join(&ctx.path.relative), ctx.uri_path).await
    else {
        return http::build_404_response();
    };
    let Ok(metadata) = fs::metadata(&target).await else {
        return http::build_404_response();
    };

    if metadata.is_dir() {
        return serve_directory(ctx, state, &root, &target).await;
    }

    // "/file.txt/" names a directory that doesn't exist
    if ctx.path.trailing_slash {
        return http::build_404_response();
    }

    serve_file(ctx, &target).await
}

/// Directory: redirect to the slash form, then index file, then listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    root: &Path,
    dir: &Path,
) -> Response<Full<Bytes>> {
    if !ctx.path.trailing_slash {
        let location = match ctx.query {
            Some(q) => format!("{}/?{q}", ctx.uri_path),
            None => format!("{}/", ctx.uri_path),
        };
        return http::build_301_response(&location);
    }

    for index_file in &state.config.site.index_files {
        let candidate = dir.join(index_file);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return match resolve_within(root, &candidate, ctx.uri_path).await {
                Some(index) => serve_file(ctx, &index).await,
                None => http::build_404_response(),
            };
        }
    }

    if !state.config.site.directory_listing {
        return http::build_404_response();
    }

    match listing::read_entries(dir).await {
        Ok(entries) => {
            http::build_html_response(listing::render(&ctx.path.decoded, &entries), ctx.is_head)
        }
        Err(e) => {
            logger::log_warning(&format!(
                "No permission to list directory '{}': {e}",
                dir.display()
            ));
            http::build_404_response()
        }
    }
}

/// Serve a regular file with validators, honouring conditional headers
async fn serve_file(ctx: &RequestContext<'_>, file_path: &Path) -> Response<Full<Bytes>> {
    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return http::build_404_response();
        }
    };

    let modified = fs::metadata(file_path)
        .await
        .and_then(|m| m.modified())
        .ok();
    let last_modified = modified.map(cache::format_http_date);
    let etag = cache::generate_etag(&content);

    // If-None-Match takes precedence; If-Modified-Since only applies without it
    let not_modified = if ctx.if_none_match.is_some() {
        cache::check_etag_match(ctx.if_none_match.as_deref(), &etag)
    } else {
        modified.is_some_and(|m| cache::not_modified_since(ctx.if_modified_since.as_deref(), m))
    };
    if not_modified {
        return http::build_304_response(&etag, last_modified.as_deref());
    }

    let meta = FileMeta {
        content_type: mime::get_content_type(file_path.extension().and_then(|e| e.to_str())),
        etag: &etag,
        last_modified: last_modified.as_deref(),
    };
    http::build_file_response(Bytes::from(content), &meta, ctx.is_head)
}

/// Canonicalize `candidate` and make sure it is still inside `root`
///
/// Lexical translation already keeps `..` in check; this catches symlinks
/// pointing out of the tree.
async fn resolve_within(root: &Path, candidate: &Path, request_path: &str) -> Option<PathBuf> {
    let canonical = fs::canonicalize(candidate).await.ok()?;
    if canonical.starts_with(root) {
        Some(canonical)
    } else {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            canonical.display()
        ));
        None
    }
}
