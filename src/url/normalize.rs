use crate::state::Partition;
use crate::url::host::host_key;
use crate::UrlError;
use url::Url;

/// Schemes whose links are checked; anything else is silently ignored
pub const SUPPORTED_SCHEMES: &[&str] = &[
    "file", "ftp", "gopher", "hdl", "http", "https", "imap", "mailto", "mms", "news", "nntp",
    "prospero", "rsync", "rtsp", "rtspu", "sftp", "shttp", "sip", "sips", "snews", "svn",
    "svn+ssh", "telnet", "wais", "ws", "wss",
];

/// A discovered link resolved to an absolute URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLink {
    pub url: Url,

    /// Whether the link's host key equals the crawl target's
    pub same_host: bool,
}

impl NormalizedLink {
    /// The registry partition this link belongs to
    pub fn partition(&self) -> Partition {
        if self.same_host {
            Partition::InSite
        } else {
            Partition::OutSite
        }
    }
}

/// Normalizes a raw href found on a page
///
/// # Normalization Steps
///
/// 1. Trim; reject empty hrefs
/// 2. If the href names a scheme, reject it unless the scheme is supported
/// 3. Without a scheme, resolve against the page URL carrying `default_scheme`,
///    so host-less hrefs land on the page's host
/// 4. Reject results without a host
/// 5. Remove the fragment
///
/// Rejected links are not errors; the caller simply skips them.
///
/// # Arguments
///
/// * `href` - The raw attribute value
/// * `base` - The final URL of the page the href was found on
/// * `target_host` - Host key of the site being crawled
/// * `default_scheme` - Scheme for links that carry none
///
/// # Examples
///
/// ```
/// use linkprobe::url::normalize_link;
/// use url::Url;
///
/// let page = Url::parse("http://example.test/docs/").unwrap();
/// let link = normalize_link("/about", &page, "example.test", "http").unwrap();
/// assert_eq!(link.url.as_str(), "http://example.test/about");
/// assert!(link.same_host);
///
/// assert!(normalize_link("javascript:void(0)", &page, "example.test", "http").is_none());
/// ```
pub fn normalize_link(
    href: &str,
    base: &Url,
    target_host: &str,
    default_scheme: &str,
) -> Option<NormalizedLink> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut url = match explicit_scheme(href) {
        Some(scheme) => {
            if !is_supported_scheme(scheme) {
                return None;
            }
            Url::parse(href).ok()?
        }
        None => {
            let mut base = base.clone();
            if base.scheme() != default_scheme {
                base.set_scheme(default_scheme).ok()?;
            }
            base.join(href).ok()?
        }
    };

    let host = host_key(&url)?;
    url.set_fragment(None);

    Some(NormalizedLink {
        same_host: host == target_host,
        url,
    })
}

/// Builds the crawl's root URL from the configured target
///
/// The target may be a bare host (`m.sohu.com`), a `host:port`, or a full
/// `http(s)` URL.
///
/// # Examples
///
/// ```
/// use linkprobe::url::normalize_root;
///
/// let root = normalize_root("m.sohu.com", "http").unwrap();
/// assert_eq!(root.as_str(), "http://m.sohu.com/");
/// ```
pub fn normalize_root(target: &str, default_scheme: &str) -> Result<Url, UrlError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(UrlError::Parse("empty target".to_string()));
    }

    let candidate = if target.contains("://") {
        target.to_string()
    } else {
        format!("{}://{}", default_scheme, target)
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    if host_key(&url).is_none() {
        return Err(UrlError::MissingHost(candidate));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Returns whether links with this scheme are checked
pub fn is_supported_scheme(scheme: &str) -> bool {
    let scheme = scheme.to_ascii_lowercase();
    SUPPORTED_SCHEMES.contains(&scheme.as_str())
}

/// Returns the scheme an href names explicitly, per RFC 3986:
/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`
fn explicit_scheme(href: &str) -> Option<&str> {
    let colon = href.find(':')?;
    let candidate = &href[..colon];
    let mut chars = candidate.chars();

    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(candidate)
    } else {
        None
    }
}
