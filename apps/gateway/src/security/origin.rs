use axum::http::{header, HeaderMap};

/// Returns true when the request's `Origin` (or, failing that, the origin of
/// its `Referer`) is one of `allowed`. Entries in `allowed` are expected to be
/// normalised by `config::parse_origins`.
pub fn is_allowed_origin(headers: &HeaderMap, allowed: &[String]) -> bool {
    let Some(origin) = request_origin(headers) else {
        return false;
    };
    allowed.iter().any(|a| *a == origin)
}

fn request_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        let origin = normalise(origin);
        // Sandboxed frames and file:// pages send the literal "null".
        if !origin.is_empty() && origin != "null" {
            return Some(origin);
        }
    }

    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(origin_of_url)
}

/// Extracts `scheme://host[:port]` from an absolute URL.
fn origin_of_url(url: &str) -> Option<String> {
    let (scheme, rest) = url.trim().split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    // Drop any userinfo.
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    if authority.is_empty() {
        return None;
    }
    Some(normalise(&format!("{scheme}://{authority}")))
}

fn normalise(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}
