//! Path normalization
//!
//! Every path that is stored, looked up or compared goes through [`normalize`] first, so
//! `/Old-Page/`, `old-page` and `https://www.example.com/old-page?ref=x` all match the same rule.

use percent_encoding::percent_decode_str;
use percent_encoding::percent_encode_byte;
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Normalize a URL or path into the canonical form used for matching
///
/// - Lower-cased, surrounding whitespace trimmed
/// - Scheme, host, query and fragment discarded
/// - Percent-decoded once, only `%`, `?`, `#` and control characters stay encoded
/// - Unicode NFC normalization
/// - Runs of `/` collapsed, no trailing `/`, always a leading `/`
///
/// Empty input (after trimming) stays empty, anything else that ends up without a path becomes
/// `/`.
///
/// ```rust
/// assert_eq!(normalize("/Foo//Bar/"), "/foo/bar");
/// assert_eq!(normalize("https://example.com/?page=2"), "/");
/// assert_eq!(normalize("  "), "");
/// ```
pub fn normalize(url: &str) -> String {
    let url = url.trim();

    if url.is_empty() {
        return String::new();
    }

    let path = path_component(url);
    let path = percent_decode_str(&path).decode_utf8_lossy().to_lowercase();
    let path = keep_encoded(&path.nfc().collect::<String>());

    let mut segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<&str>>();

    // whitespace right before a trailing slash would be trimmed on the next pass
    while segments
        .last()
        .is_some_and(|segment| segment.trim_end().is_empty())
    {
        segments.pop();
    }

    if let Some(last) = segments.last_mut() {
        *last = last.trim_end();
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in segments {
        normalized.push('/');
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        normalized.push('/');
    }

    normalized
}

/// Get the still encoded path component of a URL
///
/// Absolute URLs are parsed, their path is used. Everything else is treated as a path, from
/// which the query and fragment are cut.
fn path_component(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
        _ => match url.find(['?', '#']) {
            Some(index) => url[..index].to_string(),
            None => url.to_string(),
        },
    }
}

/// Encode the characters that would change the path when it is decoded again
///
/// `%` itself, `?` and `#` and the control characters, everything else stays as-is
fn keep_encoded(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());

    for c in path.chars() {
        match u8::try_from(c) {
            Ok(byte) if matches!(c, '%' | '?' | '#') || c.is_ascii_control() => {
                encoded.push_str(percent_encode_byte(byte));
            }
            _ => encoded.push(c),
        }
    }

    encoded
}
