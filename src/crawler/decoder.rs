//! Response body decoding
//!
//! Turns a raw response body into text, but only for markup. Decompression and
//! charset handling follow the response headers. Anything the decoder cannot
//! handle (unknown charset, unsupported or corrupt compression) yields `None`:
//! the page is then treated as having no links rather than as an error.

use encoding_rs::{Encoding, UTF_8};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use reqwest::header::{HeaderMap, CONTENT_ENCODING, CONTENT_TYPE};
use std::borrow::Cow;
use std::io::Read;

/// Content types whose bodies are scanned for links
pub const MARKUP_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Content metadata taken from response headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentMeta {
    /// Lowercase mime essence (`text/html`), without parameters
    pub mime: Option<String>,

    /// `charset` parameter of the `Content-Type` header
    pub charset: Option<String>,

    /// Lowercase `Content-Encoding` header value
    pub encoding: Option<String>,
}

impl ContentMeta {
    /// Parses the raw `Content-Type` and `Content-Encoding` header values
    pub fn parse(content_type: Option<&str>, content_encoding: Option<&str>) -> Self {
        let mut mime = None;
        let mut charset = None;

        if let Some(value) = content_type {
            let mut parts = value.split(';');
            mime = parts
                .next()
                .map(|essence| essence.trim().to_ascii_lowercase())
                .filter(|essence| !essence.is_empty());

            charset = parts
                .filter_map(|param| param.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
                .map(|(_, value)| value.trim().trim_matches('"').to_string())
                .filter(|value| !value.is_empty());
        }

        let encoding = content_encoding
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());

        Self {
            mime,
            charset,
            encoding,
        }
    }

    /// Reads the metadata from a response's headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name| headers.get(name).and_then(|v| v.to_str().ok());
        Self::parse(get(CONTENT_TYPE), get(CONTENT_ENCODING))
    }

    /// Returns true if the body is HTML or XHTML
    pub fn is_markup(&self) -> bool {
        self.mime
            .as_deref()
            .map(|mime| MARKUP_TYPES.contains(&mime))
            .unwrap_or(false)
    }
}

/// Decodes a markup body to text
///
/// # Returns
///
/// * `Some(String)` - The decoded markup
/// * `None` - The body is not markup, or cannot be decoded
pub fn decode(meta: &ContentMeta, raw: &[u8]) -> Option<String> {
    if !meta.is_markup() {
        return None;
    }

    let bytes = decompress(meta.encoding.as_deref(), raw)?;

    let encoding = match meta.charset.as_deref() {
        Some(label) => Encoding::for_label(label.as_bytes())?,
        None => UTF_8,
    };

    // Malformed sequences become U+FFFD; the links around them stay usable
    let (text, _, _) = encoding.decode(&bytes);
    Some(text.into_owned())
}

/// Undoes the `Content-Encoding`, or returns `None` for unsupported/corrupt input
fn decompress<'a>(encoding: Option<&str>, raw: &'a [u8]) -> Option<Cow<'a, [u8]>> {
    match encoding {
        None | Some("identity") => Some(Cow::Borrowed(raw)),
        Some("gzip") | Some("x-gzip") => read_all(GzDecoder::new(raw)).map(Cow::Owned),
        // Servers disagree on whether deflate means zlib-wrapped or raw
        Some("deflate") => read_all(ZlibDecoder::new(raw))
            .or_else(|| read_all(DeflateDecoder::new(raw)))
            .map(Cow::Owned),
        Some(other) => {
            tracing::debug!("Unsupported content encoding: {}", other);
            None
        }
    }
}

fn read_all(mut reader: impl Read) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out).ok()?;
    Some(out)
}
