use url::Url;

/// Stable restaurant key: host without a leading `www.`.
///
/// Returns an empty string when the URL cannot be parsed or has no host;
/// callers treat that as invalid input.
pub fn normalize_domain(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
        .unwrap_or_default()
}

/// Resolve `href` against the page URL. Unparseable input is returned as-is.
pub fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
