use eyre::{Result, bail};
use log::{debug, warn};

use crate::captions::{CAPTION_AVAILABLE_SENTINEL, CAPTION_URLS_SENTINEL, CaptionResult};
use crate::metadata::VideoMetadata;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Shown when no strategy produced captions; the endpoint is never called.
pub const MSG_NO_CAPTIONS: &str = "字幕を取得できなかったため、この動画は要約できません。";

/// Shown when tracks were detected but their content could not be parsed.
pub const MSG_CAPTIONS_UNPARSED: &str =
    "この動画には字幕が存在しますが、内容を解析できなかったため要約できません。";

/// Shown when only caption track URLs were found.
pub const MSG_CAPTION_URLS_ONLY: &str =
    "字幕トラックのURLは検出されましたが、内容を取得できなかったため要約できません。";

/// Shown when the generation request itself fails.
pub const MSG_GENERATION_FAILED: &str =
    "要約の生成中にエラーが発生しました。しばらくしてからもう一度お試しください。";

/// Fallback phrasing the model is told to emit for an undeterminable section.
const SECTION_FALLBACK: &str = "情報がありません";

/// Sampling constraints, fixed to favor deterministic output.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 40,
            top_p: 0.8,
            max_output_tokens: 1024,
        }
    }
}

/// Everything the builder needs for one summarization call.
pub struct SummaryRequest {
    pub metadata: Option<VideoMetadata>,
    pub captions: CaptionResult,
    pub constraints: GenerationConfig,
}

/// Compose the single prompt string: constraint instructions, available
/// metadata, captions (or the no-captions fallback), and the three mandated
/// output sections.
pub fn build_prompt(metadata: Option<&VideoMetadata>, captions_text: &str) -> String {
    let mut prompt = String::from(
        "あなたはYouTube動画の要約アシスタントです。\
         以下に提供する情報のみを使用して動画を要約してください。\
         提供された情報に含まれていない内容を推測したり補足したりしてはいけません。\n\n",
    );

    fn field(prompt: &mut String, label: &str, value: &str) {
        if !value.is_empty() {
            prompt.push_str(&format!("{label}: {value}\n"));
        }
    }

    if let Some(meta) = metadata {
        prompt.push_str("【動画情報】\n");
        field(&mut prompt, "タイトル", &meta.title);
        field(&mut prompt, "チャンネル", &meta.channel_name);
        field(&mut prompt, "動画の長さ", &meta.duration);
        field(&mut prompt, "公開日", &meta.publish_date);
        field(&mut prompt, "カテゴリ", &meta.category);
        if !meta.tags.is_empty() {
            prompt.push_str(&format!("タグ: {}\n", meta.tags.join(", ")));
        }
        field(&mut prompt, "説明", &meta.description);
        prompt.push('\n');
    }

    prompt.push_str("【字幕】\n");
    if captions_text.is_empty() {
        prompt.push_str("字幕情報はありません。動画情報のみから要約してください。\n");
    } else {
        prompt.push_str(captions_text);
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\n次の3つのセクションで出力してください。\
         判断できないセクションには「{SECTION_FALLBACK}」とだけ記載してください。\n\
         主なトピック: 動画の主題を1〜2文で\n\
         重要なポイント: 箇条書きで3〜5項目\n\
         結論: 動画の結論やまとめを1〜2文で\n"
    ));

    prompt
}

/// Produce the summary text for a request.
///
/// Sentinel and unavailable caption states map to their fixed explanatory
/// strings without touching the network. A failed generation call degrades
/// to a user-facing error string, never a raw transport error.
pub async fn summarize(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    request: &SummaryRequest,
) -> Result<String> {
    let captions_text = match &request.captions {
        CaptionResult::Unavailable => return Ok(MSG_NO_CAPTIONS.to_string()),
        CaptionResult::PartialAvailable => return Ok(MSG_CAPTIONS_UNPARSED.to_string()),
        CaptionResult::Text(t) if t.starts_with(CAPTION_URLS_SENTINEL) => {
            return Ok(MSG_CAPTION_URLS_ONLY.to_string());
        }
        CaptionResult::Text(t) if t.starts_with(CAPTION_AVAILABLE_SENTINEL) => {
            return Ok(MSG_CAPTIONS_UNPARSED.to_string());
        }
        CaptionResult::Text(t) => t.as_str(),
    };

    let prompt = build_prompt(request.metadata.as_ref(), captions_text);
    match generate(client, api_key, model, &prompt, &request.constraints).await {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("Generation request failed: {e}");
            Ok(MSG_GENERATION_FAILED.to_string())
        }
    }
}

async fn generate(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<String> {
    let url =
        format!("https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={api_key}");
    debug!("Requesting summary from model {model}");

    let body = serde_json::json!({
        "contents": [
            {
                "parts": [
                    { "text": prompt }
                ]
            }
        ],
        "generationConfig": {
            "temperature": config.temperature,
            "topK": config.top_k,
            "topP": config.top_p,
            "maxOutputTokens": config.max_output_tokens
        }
    });

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("generation endpoint returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_candidate_text(&json)
}

fn extract_candidate_text(json: &serde_json::Value) -> Result<String> {
    if let Some(text) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    bail!("unexpected generation endpoint response format");
}
