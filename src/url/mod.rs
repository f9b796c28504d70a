//! URL handling module for Linkprobe
//!
//! This module resolves raw hrefs into absolute URLs, filters them by scheme,
//! and decides whether a link belongs to the crawled site.

mod host;
mod normalize;

pub use host::host_key;
pub use normalize::{
    is_supported_scheme, normalize_link, normalize_root, NormalizedLink, SUPPORTED_SCHEMES,
};
