use eyre::Result;
use log::{debug, info};

use crate::captions::{self, CaptionContext, CaptionStrategy};
use crate::config::Config;
use crate::extract_video_id;
use crate::gemini::{self, GenerationConfig, SummaryRequest};
use crate::history::{self, SummaryRecord};
use crate::metadata;
use crate::page::{PageReader, SnapshotPage};

/// What a summarization request came back with.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(SummaryRecord),
    /// Another run is already active; the caller should surface that run's
    /// result instead of starting a second pipeline.
    AlreadyRunning { video_id: String },
}

/// Drives one summarization end to end: page scrape, caption chain,
/// generation request, history append.
///
/// The in-flight session is an explicit value owned here, not ambient
/// state; at most one run is active per pipeline instance.
pub struct Pipeline {
    client: reqwest::Client,
    config: Config,
    in_flight: Option<String>,
}

impl Pipeline {
    pub fn new(client: reqwest::Client, config: Config) -> Self {
        Self {
            client,
            config,
            in_flight: None,
        }
    }

    /// Claim the session for `video_id`. Returns the already-active video
    /// when the session is taken.
    fn try_begin(&mut self, video_id: &str) -> Option<String> {
        if let Some(active) = &self.in_flight {
            return Some(active.clone());
        }
        self.in_flight = Some(video_id.to_string());
        None
    }

    fn finish(&mut self) {
        self.in_flight = None;
    }

    /// Summarize the video behind `url` and record the result.
    pub async fn run(&mut self, url: &str) -> Result<RunOutcome> {
        let video_id = extract_video_id(url)
            .ok_or_else(|| eyre::eyre!("could not extract video ID from: {url}"))?;

        if let Some(active) = self.try_begin(&video_id) {
            info!("Summarization already running for {active}, not starting another");
            return Ok(RunOutcome::AlreadyRunning { video_id: active });
        }

        let strategies =
            captions::default_strategies(self.config.youtube_access_token().is_some());
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        let result = async {
            let mut page = SnapshotPage::open(&self.client, &watch_url).await?;
            self.summarize_on_page(&strategies, &mut page, &video_id).await
        }
        .await;
        self.finish();

        let record = result?;
        history::append(record.clone())?;
        Ok(RunOutcome::Completed(record))
    }

    /// Run the extraction and summarization stages against an already-open
    /// page. The page is closed on every exit path, success or not.
    pub async fn summarize_on_page(
        &self,
        strategies: &[Box<dyn CaptionStrategy>],
        page: &mut dyn PageReader,
        video_id: &str,
    ) -> Result<SummaryRecord> {
        let result = self.stages(strategies, page, video_id).await;
        page.close().await;
        result
    }

    async fn stages(
        &self,
        strategies: &[Box<dyn CaptionStrategy>],
        page: &mut dyn PageReader,
        video_id: &str,
    ) -> Result<SummaryRecord> {
        let meta = metadata::extract(page).await;

        let token = self.config.youtube_access_token();
        let ctx = CaptionContext {
            client: &self.client,
            preferred_lang: self.config.preferred_lang(),
            secondary_lang: self.config.secondary_lang(),
            access_token: token.as_deref(),
        };
        let captions = captions::run_chain(strategies, &ctx, page, video_id).await?;
        debug!("Caption chain outcome: {captions:?}");

        // The key is only required when a generation call will actually
        // happen; sentinel and unavailable states resolve without it.
        let api_key = if captions.is_usable_text() {
            Some(self.config.gemini_api_key()?)
        } else {
            None
        };

        let request = SummaryRequest {
            metadata: Some(meta.clone()),
            captions,
            constraints: GenerationConfig::default(),
        };
        let summary_text = gemini::summarize(
            &self.client,
            api_key.as_deref().unwrap_or_default(),
            self.config.model(),
            &request,
        )
        .await?;

        let title = if meta.title.is_empty() { video_id } else { meta.title.as_str() };
        Ok(SummaryRecord::new(video_id, title, &summary_text))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::captions::{AuthExpired, CaptionResult, TranscriptPanel};
    use crate::gemini::MSG_NO_CAPTIONS;
    use crate::page::testing::FakePage;
    use crate::parse::parse_summary;

    struct Fixed(CaptionResult);

    #[async_trait]
    impl CaptionStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn attempt(
            &self,
            _ctx: &CaptionContext<'_>,
            _page: &mut dyn PageReader,
            _video_id: &str,
        ) -> Result<CaptionResult> {
            Ok(self.0.clone())
        }
    }

    struct AuthFailing;

    #[async_trait]
    impl CaptionStrategy for AuthFailing {
        fn name(&self) -> &'static str {
            "auth-failing"
        }

        async fn attempt(
            &self,
            _ctx: &CaptionContext<'_>,
            _page: &mut dyn PageReader,
            _video_id: &str,
        ) -> Result<CaptionResult> {
            Err(eyre::Report::new(AuthExpired))
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(reqwest::Client::new(), Config::default())
    }

    #[test]
    fn test_in_flight_guard_redirects_second_run() {
        let mut p = pipeline();
        assert_eq!(p.try_begin("aaaaaaaaaaa"), None);
        assert_eq!(p.try_begin("bbbbbbbbbbb"), Some("aaaaaaaaaaa".to_string()));
        p.finish();
        assert_eq!(p.try_begin("bbbbbbbbbbb"), None);
    }

    #[tokio::test]
    async fn test_no_captions_yields_fixed_message_and_closes_page() {
        let p = pipeline();
        let mut page = FakePage::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        let strategies: Vec<Box<dyn CaptionStrategy>> = vec![Box::new(Fixed(CaptionResult::Unavailable))];

        let record = p
            .summarize_on_page(&strategies, &mut page, "dQw4w9WgXcQ")
            .await
            .unwrap();
        assert!(page.closed);
        assert_eq!(record.summary_text, MSG_NO_CAPTIONS);
        // No title on the page: the record falls back to the video ID.
        assert_eq!(record.title, "dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_page_closed_on_error_path() {
        let p = pipeline();
        let mut page = FakePage::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        let strategies: Vec<Box<dyn CaptionStrategy>> = vec![Box::new(AuthFailing)];

        let result = p.summarize_on_page(&strategies, &mut page, "dQw4w9WgXcQ").await;
        assert!(result.is_err());
        assert!(page.closed);
        // The surfaced error is the re-authentication instruction, not a
        // generic network failure.
        let message = format!("{}", result.unwrap_err());
        assert!(message.contains("再度ログイン"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn test_end_to_end_with_scraped_captions() {
        let p = pipeline();
        let mut page = FakePage::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        page.title = Some("Test Video - YouTube".to_string());
        page.reveal_on_activate.insert(
            r#"button[aria-label="文字起こしを表示"]"#.to_string(),
            (
                "ytd-transcript-segment-renderer .segment-text".to_string(),
                vec!["Hello world.".to_string()],
            ),
        );

        // Caption acquisition sees the mocked transcript.
        let strategies: Vec<Box<dyn CaptionStrategy>> = vec![Box::new(TranscriptPanel)];
        let ctx = CaptionContext {
            client: &p.client,
            preferred_lang: "ja",
            secondary_lang: "en",
            access_token: None,
        };
        let captions = captions::run_chain(&strategies, &ctx, &mut page, "dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(captions, CaptionResult::Text("Hello world.".to_string()));

        // The prompt embeds the scraped captions verbatim.
        let meta = metadata::extract(&mut page).await;
        let prompt = gemini::build_prompt(Some(&meta), "Hello world.");
        assert!(prompt.contains("Hello world."));

        // A mocked model response with three labeled sections yields a
        // fully structured record.
        let response = "主なトピック: テスト動画の話題\n重要なポイント:\n- 一点目\n- 二点目\n結論: テストのまとめ";
        let before = Utc::now();
        let record = SummaryRecord::new("dQw4w9WgXcQ", &meta.title, response);
        assert_eq!(record.video_id, "dQw4w9WgXcQ");
        assert!(record.timestamp >= before);
        assert!(record.timestamp <= Utc::now());

        let parsed = parse_summary(&record.summary_text);
        assert_eq!(parsed.main_topic, "テスト動画の話題");
        assert_eq!(parsed.key_points, vec!["一点目", "二点目"]);
        assert_eq!(parsed.conclusion, "テストのまとめ");
    }

    #[tokio::test]
    async fn test_run_rejects_unrecognized_url() {
        let mut p = pipeline();
        let result = p.run("https://example.com/not-a-video").await;
        assert!(result.is_err());
        // A failed ID extraction never claims the session.
        assert_eq!(p.in_flight, None);
    }
}
