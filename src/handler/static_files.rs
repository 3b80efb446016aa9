//! Static file serving module
//!
//! Fallback for every non-API GET/HEAD: serves files below the static root,
//! with index files for directories and `ETag` revalidation.

use crate::config::Config;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Request details the static responder cares about
pub struct StaticRequest<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Serve a static file for `req`, or a plain 404
pub async fn serve(req: &StaticRequest<'_>, config: &Config) -> Response<Full<Bytes>> {
    let root = Path::new(&config.static_files.root);
    let Some(file_path) = resolve(root, req.path, &config.static_files.index_files).await else {
        return http::build_404_response();
    };

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return http::build_404_response();
        }
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(req.if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    http::response::build_file_response(
        Bytes::from(content),
        mime::content_type_for(&file_path),
        &etag,
        req.is_head,
    )
}

/// Map a request path onto a file below `root`, refusing anything that escapes it
async fn resolve(root: &Path, request_path: &str, index_files: &[String]) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    let mut file_path = root.join(relative);

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static root not found or inaccessible '{}': {e}",
                root.display()
            ));
            return None;
        }
    };

    if fs::metadata(&file_path).await.is_ok_and(|m| m.is_dir()) {
        for index_file in index_files {
            let candidate = file_path.join(index_file);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                file_path = candidate;
                break;
            }
        }
    }

    // Missing files are the common 404 case, not worth a warning
    let canonical = fs::canonicalize(&file_path).await.ok()?;
    if !canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            canonical.display()
        ));
        return None;
    }

    fs::metadata(&canonical)
        .await
        .is_ok_and(|m| m.is_file())
        .then_some(canonical)
}
