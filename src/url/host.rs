use url::Url;

/// Extracts the comparable host key from a URL
///
/// The key is the lowercase host, followed by `:port` when the URL names a
/// port other than its scheme's default. Two URLs belong to the same site
/// exactly when their host keys are equal.
///
/// # Returns
///
/// * `Some(String)` - The host key
/// * `None` - If the URL has no host (e.g. `mailto:` URLs)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use linkprobe::url::host_key;
///
/// let url = Url::parse("https://EXAMPLE.test/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.test".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
///
/// let url = Url::parse("http://example.test:80/").unwrap();
/// assert_eq!(host_key(&url), Some("example.test".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
