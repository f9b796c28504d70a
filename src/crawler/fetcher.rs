//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - GET requests with transparent redirect following
//! - Error classification into terminal and retryable failures

use crate::crawler::decoder::ContentMeta;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Redirect hops followed before the exchange counts as a protocol error
const MAX_REDIRECTS: usize = 10;

/// A successfully received response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; its host decides whether the page is scanned
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content type, charset and encoding
    pub meta: ContentMeta,

    /// Raw, still-compressed body
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Status code with its canonical reason, e.g. `404 Not Found`
    pub fn status_line(&self) -> String {
        match reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
        {
            Some(reason) => format!("{} {}", self.status, reason),
            None => self.status.to_string(),
        }
    }
}

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// A response arrived, whatever its status code
    Success(FetchedPage),

    /// Connection refused/reset or timed out, DNS failure, unsupported scheme; terminal
    ClientError { cause: String },

    /// The request did not finish within the timeout; retryable
    Timeout { cause: String },

    /// Malformed exchange: broken body, redirect loop; terminal
    ProtocolError { cause: String },
}

/// Handshake limit for a fetch timeout
///
/// Kept strictly below the overall timeout, so a stalled connect surfaces as a
/// connect error instead of racing the request timer.
fn connect_timeout(timeout: Duration) -> Duration {
    timeout.saturating_sub(timeout / 10)
}

/// Builds an HTTP client with proper configuration
///
/// Automatic decompression is switched off so that the content decoder sees
/// the body exactly as declared by `Content-Encoding`.
///
/// # Arguments
///
/// * `user_agent` - Value of the `User-Agent` header
/// * `timeout` - End-to-end limit for one request, connect and body included
///
/// # Example
///
/// ```no_run
/// use linkprobe::config::DEFAULT_USER_AGENT;
/// use linkprobe::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(DEFAULT_USER_AGENT, Duration::from_secs(100)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(connect_timeout(timeout))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .no_gzip()
        .no_brotli()
        .no_deflate()
        .build()
}

/// Performs GET requests for the crawl
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
        })
    }

    /// Fetches a URL, reading the whole body
    ///
    /// Never fails: every failure is classified into a [`FetchOutcome`].
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let meta = ContentMeta::from_headers(response.headers());

        match response.bytes().await {
            Ok(body) => FetchOutcome::Success(FetchedPage {
                final_url,
                status,
                meta,
                body: body.to_vec(),
            }),
            Err(e) => classify_error(&e),
        }
    }
}

/// Maps a reqwest error onto the fetch outcome taxonomy
///
/// Only a timeout after the connection is up is retryable; a connect timeout
/// is a client error like any other failed connect.
fn classify_error(e: &reqwest::Error) -> FetchOutcome {
    let cause = e.to_string();

    if e.is_connect() {
        FetchOutcome::ClientError { cause }
    } else if e.is_timeout() {
        FetchOutcome::Timeout { cause }
    } else if e.is_redirect() || e.is_body() || e.is_decode() {
        FetchOutcome::ProtocolError { cause }
    } else {
        FetchOutcome::ClientError { cause }
    }
}
