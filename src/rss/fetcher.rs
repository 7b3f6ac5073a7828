//! RSS feed fetcher.
//!
//! Downloads a feed over HTTP with resource limits and decodes it into an
//! [`RssDocument`]. Private and loopback hosts can be refused to avoid SSRF.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::PollConfig;
use crate::rss::types::RssDocument;
use crate::shutdown::Shutdown;
use crate::{GatorError, Result};

/// HTTP client wrapper used by the poller.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
    block_private_hosts: bool,
}

impl FeedFetcher {
    /// Build a fetcher from the polling settings.
    pub fn new(config: &PollConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            block_private_hosts: config.block_private_hosts,
        })
    }

    /// Fetch and decode the feed at `url`.
    ///
    /// Returns [`GatorError::Cancelled`] as soon as `shutdown` fires; the
    /// in-flight request is dropped.
    pub async fn fetch(&self, url: &str, shutdown: &Shutdown) -> Result<RssDocument> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(GatorError::Cancelled),
            result = self.fetch_inner(url) => result,
        }
    }

    async fn fetch_inner(&self, url: &str) -> Result<RssDocument> {
        check_url(url, self.block_private_hosts).map_err(GatorError::Fetch)?;

        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatorError::Fetch(format!("HTTP error: {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(GatorError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(GatorError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        let body = std::str::from_utf8(&bytes)
            .map_err(|e| GatorError::Decode(format!("feed is not valid UTF-8: {}", e)))?;
        parse_document(body)
    }
}

/// Decode an RSS 2.0 document and unescape its HTML entities.
///
/// Prefixed extension elements (`atom:link`, `itunes:title`, `media:*`) are
/// left out; only the plain RSS elements are read.
pub fn parse_document(body: &str) -> Result<RssDocument> {
    let channel = ::rss::Channel::read_from(body.as_bytes())
        .map_err(|e| GatorError::Decode(format!("failed to parse feed: {}", e)))?;
    let mut document = RssDocument::from(channel);
    unescape_document(&mut document);
    Ok(document)
}

/// Decode HTML entities in titles and descriptions, exactly once.
fn unescape_document(document: &mut RssDocument) {
    let channel = &mut document.channel;
    unescape_in_place(&mut channel.title);
    unescape_in_place(&mut channel.description);
    for item in &mut channel.items {
        unescape_in_place(&mut item.title);
        unescape_in_place(&mut item.description);
    }
}

fn unescape_in_place(text: &mut String) {
    if text.contains('&') {
        *text = html_escape::decode_html_entities(text.as_str()).into_owned();
    }
}

/// Check that a feed URL is usable.
///
/// The scheme must be http or https and a host must be present. With
/// `block_private_hosts`, local names and private addresses are refused.
pub fn validate_url(url: &str, block_private_hosts: bool) -> Result<()> {
    check_url(url, block_private_hosts).map_err(GatorError::Validation)
}

fn check_url(url: &str, block_private_hosts: bool) -> std::result::Result<(), String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("invalid URL: {}", e))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(format!("unsupported URL scheme: {}", scheme)),
    }

    let host = parsed.host().ok_or_else(|| "URL has no host".to_string())?;

    if !block_private_hosts {
        return Ok(());
    }

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(format!("forbidden host: {}", domain));
            }
        }
        url::Host::Ipv4(ipv4) => {
            let ip = IpAddr::V4(ipv4);
            if is_private_ip(&ip) {
                return Err(format!("private IP address not allowed: {}", ip));
            }
        }
        url::Host::Ipv6(ipv6) => {
            let ip = IpAddr::V6(ipv6);
            if is_private_ip(&ip) {
                return Err(format!("private IP address not allowed: {}", ip));
            }
        }
    }

    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: [&str; 7] = [
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                || ipv4.is_documentation()
                // Carrier-grade NAT: 100.64.0.0/10
                || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (first & 0xffc0) == 0xfe80
                || ipv6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Lane&apos;s Blog</title>
    <link>https://www.wagslane.dev/</link>
    <description>Recent content on Lane&amp;#39;s Blog</description>
    <atom:link href="https://www.wagslane.dev/index.xml" rel="self" type="application/rss+xml"/>
    <item>
      <title>The Zen of Proverbs</title>
      <link>https://www.wagslane.dev/posts/zen-of-proverbs/</link>
      <pubDate>Sun, 19 Feb 2023 00:00:00 +0000</pubDate>
      <description>20 rules of thumb &amp;amp; more</description>
    </item>
    <item>
      <title><![CDATA[Go &amp; Rust]]></title>
      <link>https://www.wagslane.dev/posts/go-rust/</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_document() {
        let doc = parse_document(SAMPLE_FEED).unwrap();
        assert_eq!(doc.channel.title, "Lane's Blog");
        assert_eq!(doc.channel.link, "https://www.wagslane.dev/");
        assert_eq!(doc.channel.items.len(), 2);

        let first = &doc.channel.items[0];
        assert_eq!(first.title, "The Zen of Proverbs");
        assert_eq!(first.link, "https://www.wagslane.dev/posts/zen-of-proverbs/");
        assert_eq!(first.pub_date, "Sun, 19 Feb 2023 00:00:00 +0000");

        let second = &doc.channel.items[1];
        assert!(second.pub_date.is_empty());
        assert!(second.description.is_empty());
    }

    #[test]
    fn test_parse_document_unescapes_once() {
        let doc = parse_document(SAMPLE_FEED).unwrap();
        assert_eq!(doc.channel.description, "Recent content on Lane's Blog");
        assert_eq!(doc.channel.items[0].description, "20 rules of thumb & more");
        assert_eq!(doc.channel.items[1].title, "Go & Rust");

        let xml = r#"<rss><channel><title>T</title>
            <item><title>Tom &amp;amp;amp; Jerry</title><link>https://e.com/1</link></item>
        </channel></rss>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.channel.items[0].title, "Tom &amp; Jerry");
    }

    #[test]
    fn test_parse_document_ignores_extension_elements() {
        let xml = r#"<rss version="2.0"
            xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
            xmlns:media="http://search.yahoo.com/mrss/"
            xmlns:dc="http://purl.org/dc/elements/1.1/">
          <channel>
            <title>Podcast</title>
            <itunes:title>Podcast on iTunes</itunes:title>
            <item>
              <itunes:title>Episode one (iTunes)</itunes:title>
              <title>Episode one</title>
              <media:title>Episode one (media)</media:title>
              <link>https://pod.example.com/1</link>
              <description>Plain description</description>
              <media:description>Media description</media:description>
              <dc:creator>Lane</dc:creator>
              <guid isPermaLink="false">ep-1</guid>
              <category>go</category>
              <category>rust</category>
            </item>
          </channel>
        </rss>"#;

        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.channel.title, "Podcast");
        assert_eq!(doc.channel.items.len(), 1);
        let item = &doc.channel.items[0];
        assert_eq!(item.title, "Episode one");
        assert_eq!(item.description, "Plain description");
        assert_eq!(item.link, "https://pod.example.com/1");
    }

    #[test]
    fn test_parse_document_without_items() {
        let doc = parse_document("<rss><channel><title>Empty</title></channel></rss>").unwrap();
        assert_eq!(doc.channel.title, "Empty");
        assert!(doc.channel.items.is_empty());
    }

    #[test]
    fn test_parse_document_malformed() {
        let result = parse_document("<rss><channel><title>Broken</channel></rss>");
        assert!(matches!(result, Err(GatorError::Decode(_))));
    }

    #[test]
    fn test_parse_document_missing_channel() {
        let result = parse_document(r#"<rss version="2.0"></rss>"#);
        assert!(matches!(result, Err(GatorError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_cancelled_before_request() {
        let fetcher = FeedFetcher::new(&PollConfig::default()).unwrap();
        let (trigger, shutdown) = Shutdown::new();
        trigger.trigger();

        let result = fetcher.fetch("https://example.com/feed.xml", &shutdown).await;
        assert!(matches!(result, Err(GatorError::Cancelled)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_url_as_fetch_error() {
        let fetcher = FeedFetcher::new(&PollConfig::default()).unwrap();
        let result = fetcher.fetch("ftp://example.com/feed.xml", &Shutdown::never()).await;
        match result {
            Err(GatorError::Fetch(msg)) => assert!(msg.contains("unsupported URL scheme")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://example.com/feed.xml", true).is_ok());
        assert!(validate_url("http://example.com/feed.xml", true).is_ok());
    }

    #[test]
    fn test_validate_url_invalid_scheme() {
        let err = validate_url("ftp://example.com/feed.xml", false).unwrap_err();
        assert!(matches!(err, GatorError::Validation(_)));
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[test]
    fn test_validate_url_not_a_url() {
        let err = validate_url("not a url", false).unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_validate_url_forbidden_hosts() {
        for url in [
            "http://localhost/feed.xml",
            "http://server.local/feed.xml",
            "http://api.internal/feed.xml",
        ] {
            let err = validate_url(url, true).unwrap_err();
            assert!(err.to_string().contains("forbidden host"), "{url}");
        }
    }

    #[test]
    fn test_validate_url_private_ips() {
        for url in [
            "http://127.0.0.1/feed.xml",
            "http://10.0.0.1/feed.xml",
            "http://172.16.0.1/feed.xml",
            "http://192.168.1.1/feed.xml",
            "http://169.254.1.1/feed.xml",
            "http://[::1]/feed.xml",
        ] {
            let err = validate_url(url, true).unwrap_err();
            assert!(err.to_string().contains("private IP"), "{url}");
        }
        assert!(validate_url("http://172.32.0.1/feed.xml", true).is_ok());
    }

    #[test]
    fn test_validate_url_private_allowed_when_not_blocking() {
        assert!(validate_url("http://127.0.0.1:8080/feed.xml", false).is_ok());
        assert!(validate_url("http://localhost/feed.xml", false).is_ok());
    }

    #[test]
    fn test_is_forbidden_hostname() {
        assert!(is_forbidden_hostname("LOCALHOST"));
        assert!(is_forbidden_hostname("api.localhost"));
        assert!(is_forbidden_hostname("nas.lan"));
        assert!(!is_forbidden_hostname("example.com"));
        assert!(!is_forbidden_hostname("localhost.example.com"));
    }

    #[test]
    fn test_is_private_ip() {
        let private = [
            "127.0.0.1",
            "10.1.2.3",
            "192.0.2.1",
            "100.64.0.1",
            "0.0.0.0",
            "fd00::1",
            "fe80::1",
            "::ffff:10.0.0.1",
        ];
        for ip in private {
            assert!(is_private_ip(&ip.parse().unwrap()), "{ip}");
        }
        let public = ["8.8.8.8", "100.128.0.1", "2001:4860:4860::8888"];
        for ip in public {
            assert!(!is_private_ip(&ip.parse().unwrap()), "{ip}");
        }
    }
}
