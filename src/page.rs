use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use log::debug;
use scraper::{Html, Selector};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Worst-case wait after triggering an in-page control before giving up on
/// the content it was supposed to reveal.
pub const PANEL_SETTLE: Duration = Duration::from_secs(5);

/// Poll interval for [`PageReader::wait_for_text`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Read access to a rendered video page.
///
/// The extraction pipeline depends only on this trait; how a host actually
/// reaches the DOM (HTTP snapshot, embedded browser, test fixture) is its
/// own concern. Queries never error: a missing target is `None`/empty.
#[async_trait]
pub trait PageReader: Send + Sync {
    fn url(&self) -> &str;

    /// The document title, used as a last-resort video title.
    fn page_title(&self) -> Option<String>;

    /// Trimmed text content of the first element matching `selector`.
    fn query_text(&self, selector: &str) -> Option<String>;

    /// Named attribute of the first element matching `selector`.
    fn query_attr(&self, selector: &str, attr: &str) -> Option<String>;

    /// Trimmed text content of every element matching `selector`, in
    /// document order.
    fn query_all_text(&self, selector: &str) -> Vec<String>;

    /// Named attribute of every element matching `selector`, in document
    /// order.
    fn query_all_attr(&self, selector: &str, attr: &str) -> Vec<String>;

    /// Cue lines from native text tracks, when the host exposes any.
    fn text_track_cues(&self) -> Vec<String> {
        Vec::new()
    }

    /// Best-effort activation of an in-page control (a click, roughly).
    /// Returns false when the control is missing or the host cannot
    /// dispatch events; callers must treat that as a non-event.
    async fn activate(&mut self, selector: &str) -> bool;

    /// Release whatever the host holds for this page. Idempotent.
    async fn close(&mut self) {}

    /// Poll `selector` until it yields non-empty text or `budget` runs out.
    ///
    /// Replaces fixed settle sleeps with an explicit readiness check while
    /// keeping the same worst-case wait.
    async fn wait_for_text(&self, selector: &str, budget: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            if let Some(text) = self.query_text(selector)
                && !text.is_empty()
            {
                return Some(text);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// A [`PageReader`] over a one-shot HTTP fetch of the page HTML.
///
/// Holds the raw markup and parses per query so the value stays `Send`;
/// a handful of queries per run makes that a non-issue. Static markup
/// means `activate` can never reveal anything and waits resolve
/// immediately.
pub struct SnapshotPage {
    url: String,
    html: String,
    closed: bool,
}

impl SnapshotPage {
    /// Fetch `url` and capture its markup.
    pub async fn open(client: &reqwest::Client, url: &str) -> Result<Self> {
        debug!("Fetching page snapshot: {url}");
        let html = client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(Self {
            url: url.to_string(),
            html,
            closed: false,
        })
    }

    /// Build a snapshot from markup already in hand.
    pub fn from_html(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            html: html.to_string(),
            closed: false,
        }
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

#[async_trait]
impl PageReader for SnapshotPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn page_title(&self) -> Option<String> {
        self.query_text("title")
    }

    fn query_text(&self, selector: &str) -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        let doc = self.document();
        let el = doc.select(&sel).next()?;
        let text = el.text().collect::<String>().trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }

    fn query_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        let doc = self.document();
        let el = doc.select(&sel).next()?;
        let value = el.value().attr(attr)?.trim().to_string();
        if value.is_empty() { None } else { Some(value) }
    }

    fn query_all_text(&self, selector: &str) -> Vec<String> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        let doc = self.document();
        doc.select(&sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn query_all_attr(&self, selector: &str, attr: &str) -> Vec<String> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        let doc = self.document();
        doc.select(&sel)
            .filter_map(|el| el.value().attr(attr))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }

    async fn activate(&mut self, selector: &str) -> bool {
        debug!("Snapshot page cannot activate {selector}");
        false
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.html.clear();
        }
    }

    // A snapshot never changes, so readiness is decidable in one look.
    async fn wait_for_text(&self, selector: &str, _budget: Duration) -> Option<String> {
        self.query_text(selector)
    }
}
