//! Redirect target normalization.
//!
//! Stored targets keep whatever the owner typed; a scheme is added only when
//! the link is followed.

use url::Url;

/// Prepend `https://` unless the target already has an http(s) scheme or is root-relative.
pub fn normalize(target: &str) -> String {
    let target = target.trim();

    if target.starts_with("http://") || target.starts_with("https://") || target.starts_with('/') {
        target.to_string()
    } else {
        format!("https://{}", target)
    }
}

/// Whether a normalized target may be used as a redirect location.
pub fn is_redirectable(normalized: &str) -> bool {
    // Must survive as a Location header verbatim
    if normalized.chars().any(char::is_control) {
        return false;
    }

    if normalized.starts_with('/') {
        // "//host" would be protocol-relative, not a local path
        return !normalized.starts_with("//") && !normalized.contains(char::is_whitespace);
    }

    match Url::parse(normalized) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Normalize and validate in one step.
pub fn resolve(target: &str) -> Option<String> {
    let normalized = normalize(target);
    is_redirectable(&normalized).then_some(normalized)
}
