use regex::Regex;
use serde::Serialize;

/// Shown in place of a section the response genuinely lacked.
pub const PLACEHOLDER: &str = "情報がありません";

/// Topic marker for responses that could not be parsed at all.
pub const PARSE_ERROR_MARKER: &str = "解析エラー";

/// The three logical sections of a summary. Derived from the raw response
/// text at display time; every field is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedSummary {
    pub main_topic: String,
    pub key_points: Vec<String>,
    pub conclusion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Topic,
    Points,
    Conclusion,
}

const TOPIC_WORDS: &str = "主なトピック|メイントピック|トピック|概要|動画の概要|main\\s*topic|topic|overview";
const POINTS_WORDS: &str =
    "重要(?:な|の)ポイント|主要(?:な|の)ポイント|ポイント|要点|重要点|key\\s*points?|main\\s*points?";
const CONCLUSION_WORDS: &str = "結論|まとめ|総括|最後に|conclusion|summary";

fn header_line_re(words: &str) -> Regex {
    // A header line is the labeled word alone, or followed by a colon and
    // an optional same-line remainder.
    Regex::new(&format!(r"(?i)^\s*#*\s*【?(?:{words})】?\s*(?:[:：]\s*(.*))?$")).unwrap()
}

fn span_start_res(section: Section) -> Vec<Regex> {
    let (words, number) = match section {
        Section::Topic => (TOPIC_WORDS, r"(?m)^(?:I\.|1\.|1）|【概要】)"),
        Section::Points => (POINTS_WORDS, r"(?m)^(?:II\.|2\.|2）|【ポイント】)"),
        Section::Conclusion => (CONCLUSION_WORDS, r"(?m)^(?:III\.|3\.|3）|【結論】|【まとめ】)"),
    };
    let numbered_label = match section {
        Section::Topic => r"1\s*[\.．）\)]\s*(?:主な)?トピック",
        Section::Points => r"2\s*[\.．）\)]\s*(?:重要(?:な|の)?)?ポイント",
        Section::Conclusion => r"3\s*[\.．）\)]\s*(?:結論|まとめ)",
    };
    vec![
        Regex::new(&format!(r"(?mi)^(?:{words}|{numbered_label})\s*(?:[:：]|$)")).unwrap(),
        Regex::new(number).unwrap(),
    ]
}

/// Strip markdown heading markers so labeled headers are bare words.
fn normalize(text: &str) -> String {
    Regex::new(r"(?m)^#+\s+").unwrap().replace_all(text, "").to_string()
}

fn split_paragraphs(text: &str) -> Vec<String> {
    Regex::new(r"\n\s*\n")
        .unwrap()
        .split(text)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn strip_bullet_marker(line: &str) -> String {
    Regex::new(r"^\s*(?:[-•*]|\d+[\.\)])\s*")
        .unwrap()
        .replace(line, "")
        .trim()
        .to_string()
}

fn sentence_split(text: &str) -> Vec<String> {
    Regex::new(r"[^.!?。？！]+[.!?。？！]+")
        .unwrap()
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Break a points section into individual items: bullet lines first, then
/// paragraphs, then sentences when one long paragraph is all there is.
fn split_points(section: &str) -> Vec<String> {
    let section = section.trim();
    if section.is_empty() {
        return Vec::new();
    }

    let bullet_re = Regex::new(r"(?m)^\s*(?:[-•*]|\d+[\.\)])\s*(.+)$").unwrap();
    let bullets: Vec<String> = bullet_re
        .captures_iter(section)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !bullets.is_empty() {
        return bullets;
    }

    let mut points = split_paragraphs(section);
    if points.len() <= 1 && section.chars().count() > 100 {
        let sentences = sentence_split(section);
        if sentences.len() > 1 {
            points = sentences;
        }
    }
    points
}

/// Earliest start-marker match, span until the next section's start.
fn extract_span(text: &str, starts: &[Regex], ends: &[Regex]) -> Option<String> {
    let start = starts
        .iter()
        .filter_map(|re| re.find(text))
        .min_by_key(|m| m.start())?;

    let rest = &text[start.end()..];
    let end_idx = ends
        .iter()
        .filter_map(|re| re.find(rest))
        .map(|m| m.start())
        .min()
        .unwrap_or(rest.len());

    let content = rest[..end_idx].trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Scan line by line for labeled headers, accumulating following lines into
/// the active section. Usable only when at least two sections are seen.
fn line_scan(text: &str) -> Option<(String, String, String)> {
    let headers = [
        (Section::Topic, header_line_re(TOPIC_WORDS)),
        (Section::Points, header_line_re(POINTS_WORDS)),
        (Section::Conclusion, header_line_re(CONCLUSION_WORDS)),
    ];

    let mut bodies = [String::new(), String::new(), String::new()];
    let mut seen = [false, false, false];
    let mut active: Option<usize> = None;

    for line in text.lines() {
        let header = headers
            .iter()
            .enumerate()
            .find_map(|(i, (_, re))| re.captures(line).map(|caps| (i, caps)));

        match header {
            Some((i, caps)) => {
                seen[i] = true;
                active = Some(i);
                if let Some(rest) = caps.get(1) {
                    let rest = rest.as_str().trim();
                    if !rest.is_empty() {
                        bodies[i].push_str(rest);
                        bodies[i].push('\n');
                    }
                }
            }
            None => {
                if let Some(i) = active {
                    bodies[i].push_str(line);
                    bodies[i].push('\n');
                }
            }
        }
    }

    if seen.iter().filter(|s| **s).count() < 2 {
        return None;
    }
    let [topic, points, conclusion] = bodies;
    Some((
        topic.trim().to_string(),
        points.trim().to_string(),
        conclusion.trim().to_string(),
    ))
}

/// Parse an AI response into topic / key points / conclusion.
///
/// Layered: line scanning, then full-text span extraction, then positional
/// paragraph assignment, each engaged only when the previous layer came up
/// short. Always yields non-empty structured output.
pub fn parse_summary(text: &str) -> ParsedSummary {
    if text.trim().is_empty() {
        return ParsedSummary {
            main_topic: PARSE_ERROR_MARKER.to_string(),
            key_points: vec![PLACEHOLDER.to_string()],
            conclusion: PLACEHOLDER.to_string(),
        };
    }

    let normalized = normalize(text);

    let mut main_topic = String::new();
    let mut key_points: Vec<String> = Vec::new();
    let mut conclusion = String::new();

    if let Some((topic_body, points_body, conclusion_body)) = line_scan(&normalized) {
        main_topic = topic_body;
        key_points = split_points(&points_body);
        conclusion = conclusion_body;
    }

    if main_topic.is_empty() && key_points.is_empty() && conclusion.is_empty() {
        let topic_starts = span_start_res(Section::Topic);
        let points_starts = span_start_res(Section::Points);
        let conclusion_starts = span_start_res(Section::Conclusion);

        let after_topic: Vec<Regex> = points_starts.iter().chain(&conclusion_starts).cloned().collect();

        main_topic = extract_span(&normalized, &topic_starts, &after_topic).unwrap_or_default();
        if let Some(points_body) = extract_span(&normalized, &points_starts, &conclusion_starts) {
            key_points = split_points(&points_body);
        }
        conclusion = extract_span(&normalized, &conclusion_starts, &[]).unwrap_or_default();
    }

    // When headers told us little, structure the raw text positionally.
    let total_chars = normalized.chars().count();
    let covered = main_topic.chars().count() + conclusion.chars().count();
    let insufficient = (main_topic.is_empty() && key_points.is_empty() && conclusion.is_empty())
        || (key_points.is_empty() && covered * 10 < total_chars * 3);

    if insufficient {
        let paragraphs = split_paragraphs(&normalized);
        match paragraphs.len() {
            0 => {}
            1 => {
                main_topic = normalized.trim().to_string();
            }
            2 => {
                if main_topic.is_empty() {
                    main_topic = paragraphs[0].clone();
                }
                if conclusion.is_empty() {
                    conclusion = paragraphs[1].clone();
                }
            }
            _ => {
                if main_topic.is_empty() {
                    main_topic = paragraphs[0].clone();
                }
                if key_points.is_empty() {
                    for paragraph in &paragraphs[1..paragraphs.len() - 1] {
                        key_points.extend(
                            paragraph
                                .lines()
                                .map(strip_bullet_marker)
                                .filter(|l| !l.is_empty()),
                        );
                    }
                }
                if conclusion.is_empty() {
                    conclusion = paragraphs[paragraphs.len() - 1].clone();
                }
            }
        }
    }

    ParsedSummary {
        main_topic: if main_topic.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            main_topic
        },
        key_points: if key_points.is_empty() {
            vec![PLACEHOLDER.to_string()]
        } else {
            key_points
        },
        conclusion: if conclusion.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            conclusion
        },
    }
}
