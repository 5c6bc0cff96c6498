use std::fmt;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::{debug, warn};

use crate::page::{PANEL_SETTLE, PageReader};
use crate::selector::{LookupRule, resolve_all};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Caption payloads carrying this prefix hold track URLs we could see but
/// not fetch, instead of actual text.
pub const CAPTION_URLS_SENTINEL: &str = "CAPTION_URLS:";

/// Caption payloads carrying this prefix mean tracks exist but none could
/// be parsed into text.
pub const CAPTION_AVAILABLE_SENTINEL: &str = "CAPTION_AVAILABLE:";

/// Outcome of the caption chain, consumed by the request builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionResult {
    Text(String),
    Unavailable,
    PartialAvailable,
}

impl CaptionResult {
    /// True for real transcript text, not a sentinel payload.
    pub fn is_usable_text(&self) -> bool {
        match self {
            CaptionResult::Text(t) => !t.trim().is_empty() && !is_sentinel(t),
            _ => false,
        }
    }
}

/// A caption payload that signals a degraded state instead of content.
pub fn is_sentinel(text: &str) -> bool {
    text.starts_with(CAPTION_URLS_SENTINEL) || text.starts_with(CAPTION_AVAILABLE_SENTINEL)
}

/// The stored credential no longer authorizes caption downloads.
#[derive(Debug)]
pub struct AuthExpired;

impl fmt::Display for AuthExpired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "認証の有効期限が切れています。設定画面から再度ログインしてください")
    }
}

impl std::error::Error for AuthExpired {}

/// Shared inputs for every caption strategy.
pub struct CaptionContext<'a> {
    pub client: &'a reqwest::Client,
    pub preferred_lang: &'a str,
    pub secondary_lang: &'a str,
    pub access_token: Option<&'a str>,
}

/// One way of obtaining a transcript. Failure is expected and advances the
/// chain; only the executor decides the final outcome.
#[async_trait]
pub trait CaptionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(
        &self,
        ctx: &CaptionContext<'_>,
        page: &mut dyn PageReader,
        video_id: &str,
    ) -> Result<CaptionResult>;
}

/// The strategy chain in priority order. The authorized API lookup only
/// joins when a credential is configured.
pub fn default_strategies(authorized: bool) -> Vec<Box<dyn CaptionStrategy>> {
    let mut strategies: Vec<Box<dyn CaptionStrategy>> = vec![
        Box::new(TranscriptPanel),
        Box::new(TimedText),
        Box::new(TrackList),
    ];
    if authorized {
        strategies.push(Box::new(AuthorizedApi));
    }
    strategies
}

/// Run strategies in order until one yields usable text.
///
/// Sentinel payloads are kept as a degraded fallback while later strategies
/// still get their shot. An auth failure is remembered and reported only if
/// nothing else produced captions, so the caller can tell the user to
/// re-authenticate instead of blaming the network.
pub async fn fetch_captions(
    ctx: &CaptionContext<'_>,
    page: &mut dyn PageReader,
    video_id: &str,
) -> Result<CaptionResult> {
    let strategies = default_strategies(ctx.access_token.is_some());
    run_chain(&strategies, ctx, page, video_id).await
}

pub async fn run_chain(
    strategies: &[Box<dyn CaptionStrategy>],
    ctx: &CaptionContext<'_>,
    page: &mut dyn PageReader,
    video_id: &str,
) -> Result<CaptionResult> {
    let mut degraded: Option<CaptionResult> = None;
    let mut auth_error: Option<eyre::Report> = None;

    for strategy in strategies {
        match strategy.attempt(ctx, page, video_id).await {
            Ok(result) if result.is_usable_text() => {
                debug!("Captions obtained via {}", strategy.name());
                return Ok(result);
            }
            Ok(CaptionResult::Text(t)) if is_sentinel(&t) => {
                debug!("{} produced sentinel payload", strategy.name());
                degraded.get_or_insert(CaptionResult::Text(t));
            }
            Ok(CaptionResult::PartialAvailable) => {
                degraded.get_or_insert(CaptionResult::PartialAvailable);
            }
            Ok(_) => {
                debug!("{} found nothing", strategy.name());
            }
            Err(e) if e.downcast_ref::<AuthExpired>().is_some() => {
                warn!("{}: credential rejected", strategy.name());
                auth_error = Some(e);
            }
            Err(e) => {
                debug!("{} failed: {e}", strategy.name());
            }
        }
    }

    if let Some(result) = degraded {
        return Ok(result);
    }
    if let Some(e) = auth_error {
        return Err(e);
    }
    Ok(CaptionResult::Unavailable)
}

/// Decode entities, drop blank lines and bare numeric indices, and keep one
/// caption line per output line.
pub fn normalize_caption_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| html_escape::decode_html_entities(line.as_ref().trim()).to_string())
        .filter(|line| !line.is_empty() && !line.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert SubRip text to plain lines: sequence numbers and timestamp rows
/// go, text rows stay in order.
pub fn srt_to_text(srt: &str) -> String {
    normalize_caption_lines(srt.lines().filter(|line| !line.contains("-->")))
}

/// Pull the text nodes out of a timedtext XML payload, one line per cue.
pub fn parse_timedtext_xml(xml: &str) -> Result<Vec<String>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut in_cue = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                in_cue = true;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                in_cue = false;
            }
            Ok(Event::Text(ref e)) if in_cue => {
                let raw = e.unescape().unwrap_or_default().to_string();
                let text = html_escape::decode_html_entities(&raw).trim().to_string();
                if !text.is_empty() {
                    lines.push(text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing timedtext XML: {e}"),
            _ => {}
        }
    }

    Ok(lines)
}

/// Language codes to probe, most specific first: the preferred locale, its
/// base language, the secondary locale, then English variants. Dedups while
/// preserving order.
pub fn language_priority(preferred: &str, secondary: &str) -> Vec<String> {
    let mut langs: Vec<String> = Vec::new();
    let mut push = |lang: &str| {
        let lang = lang.trim();
        if !lang.is_empty() && !langs.iter().any(|l| l == lang) {
            langs.push(lang.to_string());
        }
    };

    push(preferred);
    if let Some((base, _)) = preferred.split_once('-') {
        push(base);
    }
    push(secondary);
    if let Some((base, _)) = secondary.split_once('-') {
        push(base);
    }
    push("en");
    push("en-US");
    push("en-GB");
    langs
}

fn best_language_match<'a, T>(
    tracks: &'a [T],
    lang_of: impl Fn(&T) -> &str,
    preferred: &str,
    secondary: &str,
) -> Option<&'a T> {
    tracks
        .iter()
        .find(|t| lang_of(t) == preferred)
        .or_else(|| tracks.iter().find(|t| lang_of(t).starts_with(preferred)))
        .or_else(|| tracks.iter().find(|t| lang_of(t) == secondary))
        .or_else(|| tracks.first())
}

// ---------------------------------------------------------------------------
// Strategy 1: scrape the in-page transcript panel
// ---------------------------------------------------------------------------

const TRANSCRIPT_OPENERS: &[&str] = &[
    r#"button[aria-label="文字起こしを表示"]"#,
    r#"button[aria-label="Show transcript"]"#,
    "ytd-video-description-transcript-section-renderer button",
];

const TRANSCRIPT_LINE_RULES: &[LookupRule] = &[
    LookupRule::text("ytd-transcript-segment-renderer .segment-text"),
    LookupRule::text("ytd-transcript-segment-renderer yt-formatted-string"),
    LookupRule::text("ytd-transcript-body-renderer .cue"),
];

const TRACK_URL_RULES: &[LookupRule] = &[LookupRule::attr("video track", "src")];

/// Opens the transcript panel through the page's own controls and reads the
/// rendered lines; native text-track cues are a secondary source in the
/// same step. Pages that only expose track URLs yield the URL sentinel.
pub struct TranscriptPanel;

#[async_trait]
impl CaptionStrategy for TranscriptPanel {
    fn name(&self) -> &'static str {
        "transcript-panel"
    }

    async fn attempt(
        &self,
        _ctx: &CaptionContext<'_>,
        page: &mut dyn PageReader,
        _video_id: &str,
    ) -> Result<CaptionResult> {
        for opener in TRANSCRIPT_OPENERS {
            if page.activate(opener).await {
                debug!("Opened transcript panel via {opener}");
                break;
            }
        }

        for rule in TRANSCRIPT_LINE_RULES {
            if page.wait_for_text(rule.selector, PANEL_SETTLE).await.is_some() {
                break;
            }
        }

        let lines = resolve_all(page, TRANSCRIPT_LINE_RULES);
        if !lines.is_empty() {
            return Ok(CaptionResult::Text(normalize_caption_lines(lines)));
        }

        let cues = page.text_track_cues();
        if !cues.is_empty() {
            return Ok(CaptionResult::Text(normalize_caption_lines(cues)));
        }

        let track_urls = resolve_all(page, TRACK_URL_RULES);
        if !track_urls.is_empty() {
            return Ok(CaptionResult::Text(format!(
                "{CAPTION_URLS_SENTINEL}{}",
                track_urls.join(",")
            )));
        }

        Ok(CaptionResult::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Strategy 2: probe the timedtext endpoint across languages
// ---------------------------------------------------------------------------

/// Requests the unauthenticated timedtext payload for each candidate
/// language, manually-authored tracks first, then auto-generated ones.
pub struct TimedText;

impl TimedText {
    async fn probe(client: &reqwest::Client, video_id: &str, lang: &str, asr: bool) -> Result<Vec<String>> {
        let mut url = format!("https://www.youtube.com/api/timedtext?v={video_id}&lang={lang}");
        if asr {
            url.push_str("&kind=asr");
        }
        debug!("Probing timedtext: {url}");

        let body = client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_timedtext_xml(&body)
    }
}

#[async_trait]
impl CaptionStrategy for TimedText {
    fn name(&self) -> &'static str {
        "timedtext"
    }

    async fn attempt(
        &self,
        ctx: &CaptionContext<'_>,
        _page: &mut dyn PageReader,
        video_id: &str,
    ) -> Result<CaptionResult> {
        let langs = language_priority(ctx.preferred_lang, ctx.secondary_lang);

        for asr in [false, true] {
            for lang in &langs {
                match Self::probe(ctx.client, video_id, lang, asr).await {
                    Ok(lines) if !lines.is_empty() => {
                        debug!("timedtext hit: lang={lang} asr={asr}");
                        return Ok(CaptionResult::Text(lines.join("\n")));
                    }
                    Ok(_) => {}
                    Err(e) => debug!("timedtext miss for lang={lang}: {e}"),
                }
            }
        }

        Ok(CaptionResult::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Strategy 3: track-list endpoint, then fetch the best matching track
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ListedTrack {
    lang_code: String,
    kind: String,
    name: String,
}

/// Asks the `type=list` endpoint which tracks exist, picks the best
/// language match, and fetches that one track. A listing that shows tracks
/// none of which parse yields the availability sentinel.
pub struct TrackList;

impl TrackList {
    fn parse_track_list(xml: &str) -> Result<Vec<ListedTrack>> {
        use quick_xml::Reader;
        use quick_xml::events::Event;

        let mut reader = Reader::from_str(xml);
        let mut tracks = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"track" => {
                    let mut track = ListedTrack {
                        lang_code: String::new(),
                        kind: String::new(),
                        name: String::new(),
                    };
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match attr.key.as_ref() {
                            b"lang_code" => track.lang_code = value,
                            b"kind" => track.kind = value,
                            b"name" => track.name = value,
                            _ => {}
                        }
                    }
                    if !track.lang_code.is_empty() {
                        tracks.push(track);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => bail!("error parsing track list XML: {e}"),
                _ => {}
            }
        }

        Ok(tracks)
    }

    async fn fetch_track(client: &reqwest::Client, video_id: &str, track: &ListedTrack) -> Result<Vec<String>> {
        let mut url = format!(
            "https://www.youtube.com/api/timedtext?v={video_id}&lang={}",
            track.lang_code
        );
        if !track.kind.is_empty() {
            url.push_str(&format!("&kind={}", track.kind));
        }
        if !track.name.is_empty() {
            url.push_str(&format!("&name={}", track.name));
        }

        let body = client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_timedtext_xml(&body)
    }
}

#[async_trait]
impl CaptionStrategy for TrackList {
    fn name(&self) -> &'static str {
        "track-list"
    }

    async fn attempt(
        &self,
        ctx: &CaptionContext<'_>,
        _page: &mut dyn PageReader,
        video_id: &str,
    ) -> Result<CaptionResult> {
        let list_url = format!("https://www.youtube.com/api/timedtext?type=list&v={video_id}");
        debug!("Fetching track list: {list_url}");

        let body = ctx
            .client
            .get(&list_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tracks = Self::parse_track_list(&body)?;
        if tracks.is_empty() {
            return Ok(CaptionResult::Unavailable);
        }

        let track = best_language_match(
            &tracks,
            |t| t.lang_code.as_str(),
            ctx.preferred_lang,
            ctx.secondary_lang,
        )
        .cloned();

        if let Some(track) = track {
            match Self::fetch_track(ctx.client, video_id, &track).await {
                Ok(lines) if !lines.is_empty() => {
                    debug!("track-list hit: lang={}", track.lang_code);
                    return Ok(CaptionResult::Text(lines.join("\n")));
                }
                Ok(_) => {}
                Err(e) => debug!("track fetch failed for lang={}: {e}", track.lang_code),
            }
        }

        // Tracks exist but none produced text.
        let langs: Vec<&str> = tracks.iter().map(|t| t.lang_code.as_str()).collect();
        Ok(CaptionResult::Text(format!(
            "{CAPTION_AVAILABLE_SENTINEL}{}",
            langs.join(",")
        )))
    }
}

// ---------------------------------------------------------------------------
// Strategy 4: official captions API, requires a credential
// ---------------------------------------------------------------------------

/// Lists caption tracks through the Data API with the stored OAuth token,
/// downloads the best match as SubRip, and strips it to plain text.
pub struct AuthorizedApi;

#[async_trait]
impl CaptionStrategy for AuthorizedApi {
    fn name(&self) -> &'static str {
        "captions-api"
    }

    async fn attempt(
        &self,
        ctx: &CaptionContext<'_>,
        _page: &mut dyn PageReader,
        video_id: &str,
    ) -> Result<CaptionResult> {
        let Some(token) = ctx.access_token else {
            return Ok(CaptionResult::Unavailable);
        };

        let list_url =
            format!("https://www.googleapis.com/youtube/v3/captions?part=snippet&videoId={video_id}");
        let resp = ctx.client.get(&list_url).bearer_auth(token).send().await?;

        if matches!(resp.status().as_u16(), 401 | 403) {
            return Err(eyre::Report::new(AuthExpired));
        }
        let json: serde_json::Value = resp.error_for_status()?.json().await?;

        let items = json.get("items").and_then(|i| i.as_array()).cloned().unwrap_or_default();
        if items.is_empty() {
            return Ok(CaptionResult::Unavailable);
        }

        let lang_of = |item: &serde_json::Value| -> String {
            item.get("snippet")
                .and_then(|s| s.get("language"))
                .and_then(|l| l.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let langs: Vec<String> = items.iter().map(&lang_of).collect();
        let index = best_language_match(
            &langs,
            |l| l.as_str(),
            ctx.preferred_lang,
            ctx.secondary_lang,
        )
        .and_then(|best| langs.iter().position(|l| l == best))
        .unwrap_or(0);

        let Some(caption_id) = items[index].get("id").and_then(|i| i.as_str()) else {
            return Ok(CaptionResult::PartialAvailable);
        };

        let download_url = format!("https://www.googleapis.com/youtube/v3/captions/{caption_id}?tfmt=srt");
        let resp = ctx.client.get(&download_url).bearer_auth(token).send().await?;

        if matches!(resp.status().as_u16(), 401 | 403) {
            return Err(eyre::Report::new(AuthExpired));
        }
        let srt = resp.error_for_status()?.text().await?;

        let text = srt_to_text(&srt);
        if text.is_empty() {
            // The track exists; its payload just didn't yield text.
            return Ok(CaptionResult::PartialAvailable);
        }
        Ok(CaptionResult::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::page::testing::FakePage;

    struct FixedStrategy {
        name: &'static str,
        result: CaptionResult,
        calls: Arc<AtomicUsize>,
    }

    impl FixedStrategy {
        fn new(name: &'static str, result: CaptionResult) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    result,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl CaptionStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(
            &self,
            _ctx: &CaptionContext<'_>,
            _page: &mut dyn PageReader,
            _video_id: &str,
        ) -> Result<CaptionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FailingStrategy;

    #[async_trait]
    impl CaptionStrategy for FailingStrategy {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn attempt(
            &self,
            _ctx: &CaptionContext<'_>,
            _page: &mut dyn PageReader,
            _video_id: &str,
        ) -> Result<CaptionResult> {
            bail!("network down")
        }
    }

    fn test_ctx(client: &reqwest::Client) -> CaptionContext<'_> {
        CaptionContext {
            client,
            preferred_lang: "ja",
            secondary_lang: "en",
            access_token: None,
        }
    }

    #[tokio::test]
    async fn test_chain_short_circuits_on_first_text() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");

        let (first, first_calls) = FixedStrategy::new("one", CaptionResult::Text("hello".into()));
        let (second, second_calls) = FixedStrategy::new("two", CaptionResult::Text("unused".into()));
        let strategies: Vec<Box<dyn CaptionStrategy>> = vec![Box::new(first), Box::new(second)];

        let result = run_chain(&strategies, &ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(result, CaptionResult::Text("hello".into()));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_exhaustion_yields_unavailable() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");

        let (first, _) = FixedStrategy::new("one", CaptionResult::Unavailable);
        let (third, _) = FixedStrategy::new("three", CaptionResult::Unavailable);
        let strategies: Vec<Box<dyn CaptionStrategy>> =
            vec![Box::new(first), Box::new(FailingStrategy), Box::new(third)];

        let result = run_chain(&strategies, &ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(result, CaptionResult::Unavailable);
    }

    #[tokio::test]
    async fn test_sentinel_held_while_chain_continues() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");

        let sentinel = format!("{CAPTION_URLS_SENTINEL}https://a/track");
        let (first, _) = FixedStrategy::new("one", CaptionResult::Text(sentinel.clone()));
        let (second, _) = FixedStrategy::new("two", CaptionResult::Text("real text".into()));
        let strategies: Vec<Box<dyn CaptionStrategy>> = vec![Box::new(first), Box::new(second)];

        let result = run_chain(&strategies, &ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(result, CaptionResult::Text("real text".into()));
    }

    #[tokio::test]
    async fn test_sentinel_returned_when_nothing_better() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");

        let sentinel = format!("{CAPTION_AVAILABLE_SENTINEL}en,ja");
        let (first, _) = FixedStrategy::new("one", CaptionResult::Text(sentinel.clone()));
        let (second, _) = FixedStrategy::new("two", CaptionResult::Unavailable);
        let strategies: Vec<Box<dyn CaptionStrategy>> = vec![Box::new(first), Box::new(second)];

        let result = run_chain(&strategies, &ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(result, CaptionResult::Text(sentinel));
    }

    #[tokio::test]
    async fn test_panel_scrape_reads_revealed_lines() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");
        page.reveal_on_activate.insert(
            r#"button[aria-label="文字起こしを表示"]"#.to_string(),
            (
                "ytd-transcript-segment-renderer .segment-text".to_string(),
                vec!["Hello world.".to_string(), "Second line.".to_string()],
            ),
        );

        let result = TranscriptPanel.attempt(&ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(result, CaptionResult::Text("Hello world.\nSecond line.".into()));
    }

    #[tokio::test]
    async fn test_panel_scrape_falls_back_to_cues() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");
        page.cues = vec!["cue one".to_string(), "cue two".to_string()];

        let result = TranscriptPanel.attempt(&ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(result, CaptionResult::Text("cue one\ncue two".into()));
    }

    #[tokio::test]
    async fn test_panel_scrape_track_urls_become_sentinel() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");
        page.attrs.insert(
            ("video track".to_string(), "src".to_string()),
            "https://host/track.vtt".to_string(),
        );

        let result = TranscriptPanel.attempt(&ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(
            result,
            CaptionResult::Text(format!("{CAPTION_URLS_SENTINEL}https://host/track.vtt"))
        );
    }

    #[tokio::test]
    async fn test_panel_scrape_empty_page() {
        let client = reqwest::Client::new();
        let ctx = test_ctx(&client);
        let mut page = FakePage::new("https://example.test");

        let result = TranscriptPanel.attempt(&ctx, &mut page, "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(result, CaptionResult::Unavailable);
    }

    #[test]
    fn test_language_priority_order() {
        let langs = language_priority("ja", "en");
        assert_eq!(langs, vec!["ja", "en", "en-US", "en-GB"]);
    }

    #[test]
    fn test_language_priority_splits_locale() {
        let langs = language_priority("pt-BR", "es");
        assert_eq!(langs, vec!["pt-BR", "pt", "es", "en", "en-US", "en-GB"]);
    }

    #[test]
    fn test_language_priority_dedups() {
        let langs = language_priority("en", "en");
        assert_eq!(langs, vec!["en", "en-US", "en-GB"]);
    }

    #[test]
    fn test_parse_timedtext_xml() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<transcript>
    <text start="0.21" dur="2.34">Hello world</text>
    <text start="2.55" dur="1.50">Second line</text>
</transcript>"#;
        let lines = parse_timedtext_xml(xml).unwrap();
        assert_eq!(lines, vec!["Hello world", "Second line"]);
    }

    #[test]
    fn test_parse_timedtext_xml_entities() {
        let xml = r#"<transcript><text start="0" dur="1">it&amp;#39;s &amp;quot;here&amp;quot;</text></transcript>"#;
        let lines = parse_timedtext_xml(xml).unwrap();
        assert_eq!(lines, vec!["it's \"here\""]);
    }

    #[test]
    fn test_parse_timedtext_xml_empty() {
        let lines = parse_timedtext_xml("<transcript></transcript>").unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_parse_track_list() {
        let xml = r#"<transcript_list>
  <track id="0" name="" lang_code="en" lang_original="English"/>
  <track id="1" name="CC" lang_code="ja" lang_original="Japanese" kind="asr"/>
</transcript_list>"#;
        let tracks = TrackList::parse_track_list(xml).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].lang_code, "en");
        assert_eq!(tracks[1].lang_code, "ja");
        assert_eq!(tracks[1].kind, "asr");
        assert_eq!(tracks[1].name, "CC");
    }

    #[test]
    fn test_srt_to_text() {
        let srt = "1\n00:00:00,000 --> 00:00:02,000\nHello world.\n\n2\n00:00:02,000 --> 00:00:04,000\nSecond line.\nStill second.\n";
        assert_eq!(srt_to_text(srt), "Hello world.\nSecond line.\nStill second.");
    }

    #[test]
    fn test_srt_to_text_entities() {
        let srt = "1\n00:00:00,000 --> 00:00:01,000\nit&#39;s fine\n";
        assert_eq!(srt_to_text(srt), "it's fine");
    }

    #[test]
    fn test_normalize_drops_numeric_index_lines() {
        let joined = normalize_caption_lines(["12", "  real line  ", "", "34"]);
        assert_eq!(joined, "real line");
    }

    #[test]
    fn test_is_sentinel() {
        assert!(is_sentinel("CAPTION_URLS:https://a"));
        assert!(is_sentinel("CAPTION_AVAILABLE:en"));
        assert!(!is_sentinel("normal caption text"));
    }

    #[test]
    fn test_is_usable_text() {
        assert!(CaptionResult::Text("words".into()).is_usable_text());
        assert!(!CaptionResult::Text("   ".into()).is_usable_text());
        assert!(!CaptionResult::Text("CAPTION_URLS:x".into()).is_usable_text());
        assert!(!CaptionResult::Unavailable.is_usable_text());
        assert!(!CaptionResult::PartialAvailable.is_usable_text());
    }

    #[test]
    fn test_default_strategies_gate_api_on_credential() {
        assert_eq!(default_strategies(false).len(), 3);
        assert_eq!(default_strategies(true).len(), 4);
    }
}
