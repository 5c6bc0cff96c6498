use log::debug;
use serde::{Deserialize, Serialize};

use crate::page::PageReader;
use crate::selector::{LookupRule, resolve, resolve_all};

/// Everything we can scrape about a video. Populated best-effort; any field
/// may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub channel_name: String,
    pub duration: String,
    pub publish_date: String,
    pub tags: Vec<String>,
    pub category: String,
    pub source_url: String,
}

const TITLE_RULES: &[LookupRule] = &[
    LookupRule::text("h1.title"),
    LookupRule::text("h1.style-scope.ytd-watch-metadata"),
    LookupRule::attr(r#"meta[property="og:title"]"#, "content"),
];

const DESCRIPTION_RULES: &[LookupRule] = &[
    LookupRule::attr(r#"meta[name="description"]"#, "content"),
    LookupRule::text("#description-text"),
    LookupRule::text("#description-inline-expander"),
];

const CHANNEL_RULES: &[LookupRule] = &[
    LookupRule::text("div#owner-name a"),
    LookupRule::text("#channel-name a"),
    LookupRule::text("ytd-channel-name a"),
    LookupRule::attr(r#"link[itemprop="name"]"#, "content"),
];

const DURATION_RULES: &[LookupRule] = &[
    LookupRule::text(".ytp-time-duration"),
    LookupRule::attr(r#"meta[itemprop="duration"]"#, "content"),
];

const PUBLISH_DATE_RULES: &[LookupRule] = &[
    LookupRule::text("#info-strings yt-formatted-string"),
    LookupRule::text("#info-text"),
    LookupRule::attr(r#"meta[itemprop="datePublished"]"#, "content"),
];

const TAG_RULES: &[LookupRule] = &[
    LookupRule::attr(r#"meta[property="og:video:tag"]"#, "content"),
    LookupRule::attr(r#"meta[name="keywords"]"#, "content"),
];

const CATEGORY_RULES: &[LookupRule] = &[LookupRule::attr(r#"meta[itemprop="genre"]"#, "content")];

/// Control that collapses the truncated description on watch pages.
const DESCRIPTION_EXPANDER: &str = "tp-yt-paper-button#expand";

/// Scrape metadata from the page currently representing the target video.
///
/// Pure reads, except the description expander is opportunistically
/// activated first so the full text is in the DOM; that activation failing
/// is ignored. Absent fields come back as empty strings, never errors.
pub async fn extract(page: &mut dyn PageReader) -> VideoMetadata {
    if page.activate(DESCRIPTION_EXPANDER).await {
        debug!("Expanded video description before reading");
    }

    let title = resolve(page, TITLE_RULES)
        .or_else(|| page.page_title())
        .unwrap_or_default();

    let metadata = VideoMetadata {
        title,
        description: resolve(page, DESCRIPTION_RULES).unwrap_or_default(),
        channel_name: resolve(page, CHANNEL_RULES).unwrap_or_default(),
        duration: resolve(page, DURATION_RULES).unwrap_or_default(),
        publish_date: resolve(page, PUBLISH_DATE_RULES).unwrap_or_default(),
        tags: resolve_all(page, TAG_RULES),
        category: resolve(page, CATEGORY_RULES).unwrap_or_default(),
        source_url: page.url().to_string(),
    };

    debug!(
        "Extracted metadata: title={:?} channel={:?} tags={}",
        metadata.title,
        metadata.channel_name,
        metadata.tags.len()
    );
    metadata
}
