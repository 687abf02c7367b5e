//! The root!
//!
//! Every request outside the API ends up here: redirect it when a rule says so, serve the site
//! otherwise

use std::str::Utf8Error;
use std::sync::Arc;

use anyhow::Context;
use axum::Extension;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::LOCATION;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;

use crate::resolver::RedirectResolver;
use crate::storage::Storage;

/// Extensions of files that are served as-is and never redirected
const STATIC_ASSET_EXTENSIONS: &[&str] = &[
    "js", "css", "map", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf",
    "eot", "txt", "xml", "json", "pdf",
];

/// Characters that can not be used as-is in the `Location` header
const LOCATION_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The index page of the single page app, served when nothing redirects
#[derive(Clone, Debug, Default)]
pub struct SpaIndex {
    /// Contents of the page, a `404 Not Found` is served without it
    html: Option<Arc<str>>,
}

impl SpaIndex {
    /// Load the index page from disk, if there is one
    pub async fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read the SPA index from {path}"))?;

        tracing::info!("Serving SPA index from {path}");

        Ok(Self {
            html: Some(Arc::from(html)),
        })
    }
}

/// The root!
///
/// All wildcard requests end up in this function.
///
/// A lookup in the redirect rules will be done based on the path, when found the visitor gets a
/// `301 Moved Permanently`
pub async fn root<S: Storage>(
    Extension(resolver): Extension<RedirectResolver<S>>,
    Extension(spa_index): Extension<SpaIndex>,
    uri: Uri,
) -> Result<Response, (StatusCode, String)> {
    let path = url_decode_path(uri.path()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "URL contains invalid UTF-8 characters".to_string(),
        )
    })?;

    if is_api_path(&path) {
        tracing::debug!("No API endpoint for: {path}");

        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    if !is_static_asset(&path) {
        tracing::debug!("Looking for redirect: {path}");

        // the raw path, decoding happens once during normalization
        let target = resolver.resolve(uri.path()).await.map_err(internal_error)?;

        if let Some(target) = target {
            tracing::debug!(r#"Path "{path}" redirecting to: {target}"#);

            let location = HeaderValue::from_str(&encode_location(&target))
                .map_err(internal_error)?;

            return Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response());
        }
    }

    Ok(match spa_index.html {
        Some(html) => Html(html.to_string()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

/// Utility function for mapping any error into a `500 Internal Server Error`
/// response.
fn internal_error<E>(err: E) -> (StatusCode, String)
where
    E: std::error::Error,
{
    tracing::error!("Could not handle request: {err}");

    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// URL decode path
///
/// Uses percentage encoding for the decoding, might error in case of invalid UTF-8
fn url_decode_path(path: &str) -> Result<String, Utf8Error> {
    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.to_string())
}

/// Is the path reserved for the API?
fn is_api_path(path: &str) -> bool {
    let path = path.to_lowercase();

    path == "/api" || path.starts_with("/api/")
}

/// Does the path point to a static asset?
fn is_static_asset(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or_default();

    last_segment
        .rsplit_once('.')
        .is_some_and(|(_, extension)| {
            STATIC_ASSET_EXTENSIONS.contains(&extension.to_lowercase().as_str())
        })
}

/// Encode a target path for the `Location` header
fn encode_location(target: &str) -> String {
    utf8_percent_encode(target, LOCATION_ENCODE_SET).to_string()
}
