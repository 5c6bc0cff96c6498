use crate::history::SummaryRecord;
use crate::parse::ParsedSummary;

/// Render a summary in the fixed sectioned layout.
pub fn render_text(record: &SummaryRecord, parsed: &ParsedSummary) -> String {
    let points = parsed
        .key_points
        .iter()
        .map(|p| format!("• {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "【{}】の要約\n\n■ 主なトピック\n{}\n\n■ 重要なポイント\n{}\n\n■ 結論\n{}",
        record.title, parsed.main_topic, points, parsed.conclusion
    )
}

/// Render the record and its parsed sections as JSON.
pub fn render_json(record: &SummaryRecord, parsed: &ParsedSummary) -> String {
    let value = serde_json::json!({
        "videoId": record.video_id,
        "title": record.title,
        "timestamp": record.timestamp,
        "mainTopic": parsed.main_topic,
        "keyPoints": parsed.key_points,
        "conclusion": parsed.conclusion,
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (SummaryRecord, ParsedSummary) {
        let record = SummaryRecord::new("dQw4w9WgXcQ", "Test Video", "raw summary text");
        let parsed = ParsedSummary {
            main_topic: "話題".to_string(),
            key_points: vec!["一点目".to_string(), "二点目".to_string()],
            conclusion: "まとめ".to_string(),
        };
        (record, parsed)
    }

    #[test]
    fn test_render_text_layout() {
        let (record, parsed) = sample();
        let text = render_text(&record, &parsed);
        assert!(text.starts_with("【Test Video】の要約"));
        assert!(text.contains("■ 主なトピック\n話題"));
        assert!(text.contains("• 一点目\n• 二点目"));
        assert!(text.contains("■ 結論\nまとめ"));
    }

    #[test]
    fn test_render_json_fields() {
        let (record, parsed) = sample();
        let json: serde_json::Value = serde_json::from_str(&render_json(&record, &parsed)).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["mainTopic"], "話題");
        assert_eq!(json["keyPoints"].as_array().unwrap().len(), 2);
        assert_eq!(json["conclusion"], "まとめ");
    }
}
