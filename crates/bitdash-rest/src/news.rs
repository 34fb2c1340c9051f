//! News from the exchange academy RSS feed.
//!
//! The feed is fetched once per session through a CORS relay
//! (`<relay>?url=<encoded feed url>`). Any failure (network, HTTP status,
//! unparseable document) is replaced by a fixed two-item list, so callers of
//! [`NewsFetcher::fetch`] always get something to show.

use bitdash_core::NewsItem;
use bitdash_telemetry::Metrics;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{RestError, RestResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Link used by the fallback items.
const ACADEMY_URL: &str = "https://www.bitget.com/academy/en";

/// News configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Relay endpoint; the feed URL is passed as its `url` query parameter.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// RSS feed URL.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Maximum number of items kept.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// User-Agent sent with feed requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_relay_url() -> String {
    "https://api.allorigins.win/raw".to_string()
}

fn default_feed_url() -> String {
    "https://www.bitget.com/academy/en/rss.xml".to_string()
}

fn default_limit() -> usize {
    8
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            feed_url: default_feed_url(),
            limit: default_limit(),
            user_agent: default_user_agent(),
        }
    }
}

/// RSS news fetcher.
pub struct NewsFetcher {
    client: Client,
    config: NewsConfig,
}

impl NewsFetcher {
    pub fn new(config: NewsConfig) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RestError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    /// Relay URL with the feed URL percent-encoded into its `url` parameter.
    pub fn relay_url(&self) -> RestResult<Url> {
        Url::parse_with_params(&self.config.relay_url, &[("url", self.config.feed_url.as_str())])
            .map_err(|e| RestError::InvalidUrl(format!("{}: {e}", self.config.relay_url)))
    }

    /// Fetch news items. Never fails: any error yields [`NewsFetcher::fallback`].
    pub async fn fetch(&self) -> Vec<NewsItem> {
        match self.try_fetch().await {
            Ok(items) => {
                info!(count = items.len(), "Fetched news");
                items
            }
            Err(e) => {
                warn!(error = %e, "News fetch failed, using fallback");
                Metrics::news_fallback();
                Self::fallback()
            }
        }
    }

    /// Fetch and parse through the relay, surfacing errors.
    pub async fn try_fetch(&self) -> RestResult<Vec<NewsItem>> {
        let url = self.relay_url()?;
        debug!(url = %url, "Fetching news");
        let xml = self.get_text(url, "news_relay").await?;
        parse_rss(&xml, self.config.limit)
    }

    /// Fetch the raw feed document directly (no relay).
    pub async fn fetch_raw_feed(&self) -> RestResult<String> {
        let url = Url::parse(&self.config.feed_url)
            .map_err(|e| RestError::InvalidUrl(format!("{}: {e}", self.config.feed_url)))?;
        self.get_text(url, "news_feed").await
    }

    async fn get_text(&self, url: Url, endpoint: &str) -> RestResult<String> {
        let result = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| RestError::HttpClient(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RestError::Status {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                });
            }

            response
                .text()
                .await
                .map_err(|e| RestError::HttpClient(format!("Failed to read body: {e}")))
        }
        .await;

        Metrics::rest_request(endpoint, result.is_ok());
        result
    }

    /// Placeholder items shown when the feed is unavailable.
    pub fn fallback() -> Vec<NewsItem> {
        vec![
            NewsItem::new("What is Perpetual Futures?", ACADEMY_URL),
            NewsItem::new("Funding Rate Explained", ACADEMY_URL),
        ]
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ItemField {
    Title,
    Link,
    PubDate,
}

impl ItemField {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"pubDate" => Some(Self::PubDate),
            _ => None,
        }
    }
}

#[derive(Default)]
struct PartialItem {
    title: String,
    link: String,
    pub_date: String,
}

impl PartialItem {
    fn push(&mut self, field: ItemField, text: &str) {
        let target = match field {
            ItemField::Title => &mut self.title,
            ItemField::Link => &mut self.link,
            ItemField::PubDate => &mut self.pub_date,
        };
        target.push_str(text);
    }

    fn finish(self) -> NewsItem {
        let title = self.title.trim().to_string();
        let link = match self.link.trim() {
            "" => "#".to_string(),
            link => link.to_string(),
        };
        let published_at = match self.pub_date.trim() {
            "" => None,
            date => Some(date.to_string()),
        };
        NewsItem {
            title,
            link,
            published_at,
        }
    }
}

/// Parse `<item>` entries of an RSS document, keeping the first `limit`.
///
/// Missing `title` becomes `""`, missing `link` becomes `"#"`, missing
/// `pubDate` becomes `None`. A document without an `<rss>` or `<channel>`
/// element is rejected.
pub fn parse_rss(xml: &str, limit: usize) -> RestResult<Vec<NewsItem>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut saw_channel = false;
    let mut current: Option<PartialItem> = None;
    let mut field: Option<ItemField> = None;

    loop {
        if items.len() >= limit {
            break;
        }

        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"rss" | b"channel" => saw_channel = true,
                b"item" => {
                    current = Some(PartialItem::default());
                    field = None;
                }
                name if current.is_some() => field = ItemField::from_tag(name),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" => {
                    if let Some(item) = current.take() {
                        items.push(item.finish());
                    }
                    field = None;
                }
                name if ItemField::from_tag(name).is_some() => field = None,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    let text = t.unescape().map_err(|e| RestError::Rss(e.to_string()))?;
                    item.push(f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    item.push(f, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RestError::Rss(format!(
                    "at position {}: {e}",
                    reader.error_position()
                )))
            }
            _ => {}
        }
    }

    if !saw_channel {
        return Err(RestError::Rss("document has no rss channel".to_string()));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Bitget Academy</title>
    <link>https://www.bitget.com/academy/en</link>
    <atom:link href="https://www.bitget.com/academy/en/rss.xml" rel="self"/>
    <item>
      <title><![CDATA[Bitcoin &amp; Halving]]></title>
      <link>https://www.bitget.com/academy/en/halving</link>
      <pubDate>Mon, 01 Apr 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Fees &amp; Funding</title>
    </item>
    <item>
      <link>https://www.bitget.com/academy/en/untitled</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_rss(FEED, 8).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title, "Bitcoin &amp; Halving");
        assert_eq!(items[0].link, "https://www.bitget.com/academy/en/halving");
        assert_eq!(
            items[0].published_at.as_deref(),
            Some("Mon, 01 Apr 2024 00:00:00 GMT")
        );

        assert_eq!(items[1].title, "Fees & Funding");
        assert_eq!(items[1].link, "#");
        assert!(items[1].published_at.is_none());

        assert_eq!(items[2].title, "");
        assert_eq!(items[2].link, "https://www.bitget.com/academy/en/untitled");
    }

    #[test]
    fn test_parse_rss_channel_title_not_an_item() {
        let items = parse_rss(FEED, 8).unwrap();
        assert!(items.iter().all(|item| item.title != "Bitget Academy"));
    }

    #[test]
    fn test_parse_rss_respects_limit() {
        let mut xml = String::from("<rss><channel>");
        for i in 0..20 {
            xml.push_str(&format!("<item><title>Item {i}</title><link>https://x/{i}</link></item>"));
        }
        xml.push_str("</channel></rss>");

        let items = parse_rss(&xml, 8).unwrap();
        assert_eq!(items.len(), 8);
        assert_eq!(items[7].title, "Item 7");
    }

    #[test]
    fn test_parse_rss_rejects_non_feed() {
        assert!(parse_rss(r#"{"fallback":true,"items":[]}"#, 8).is_err());
        assert!(parse_rss("<rss><channel><item></title></channel></rss>", 8).is_err());
    }

    #[test]
    fn test_parse_rss_empty_channel() {
        let items = parse_rss("<rss><channel></channel></rss>", 8).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_fallback_items() {
        let items = NewsFetcher::fallback();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "What is Perpetual Futures?");
        assert_eq!(items[1].title, "Funding Rate Explained");
        assert!(items.iter().all(|item| item.link == ACADEMY_URL));
    }

    #[test]
    fn test_relay_url_encodes_feed() {
        let fetcher = NewsFetcher::new(NewsConfig::default()).unwrap();
        let url = fetcher.relay_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.allorigins.win/raw?url=https%3A%2F%2Fwww.bitget.com%2Facademy%2Fen%2Frss.xml"
        );
    }
}
