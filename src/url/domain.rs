use url::Url;

/// Extracts the host component of a URL string
///
/// Returns None if the string does not parse as an absolute URL or the URL
/// has no host (e.g. `mailto:` or `file:` URLs). The host is returned as the
/// URL parser yields it; no `www.` stripping or other normalization is done.
///
/// # Examples
///
/// ```
/// use spider_index::url::extract_host;
///
/// assert_eq!(extract_host("http://a.test/x"), Some("a.test".to_string()));
/// assert_eq!(extract_host("mailto:someone@a.test"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Returns true if both URLs have a host and the hosts are equal
///
/// Subdomains are distinct hosts and the scheme and port are ignored, so
/// `http://a.test` and `https://a.test:8443/y` are the same domain while
/// `http://www.a.test` is not.
pub fn is_same_domain(base: &str, link: &str) -> bool {
    match (extract_host(base), extract_host(link)) {
        (Some(base_host), Some(link_host)) => base_host == link_host,
        _ => false,
    }
}
