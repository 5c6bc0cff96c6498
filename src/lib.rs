pub mod captions;
pub mod config;
pub mod gemini;
pub mod history;
pub mod metadata;
pub mod output;
pub mod page;
pub mod parse;
pub mod pipeline;
pub mod selector;

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    // Bare 11-character video ID
    if regex::Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap().is_match(input) {
        return Some(input.to_string());
    }

    // youtube.com/watch?v=ID (v= anywhere in the query string)
    if let Some(caps) = regex::Regex::new(r"(?:youtube\.com/watch\?.*v=)([a-zA-Z0-9_-]{11})")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtu.be/ID
    if let Some(caps) = regex::Regex::new(r"youtu\.be/([a-zA-Z0-9_-]{11})")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtube.com/embed/ID
    if let Some(caps) = regex::Regex::new(r"youtube\.com/embed/([a-zA-Z0-9_-]{11})")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtube.com/shorts/ID
    if let Some(caps) = regex::Regex::new(r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    // youtube.com/v/ID (legacy player URLs)
    if let Some(caps) = regex::Regex::new(r"youtube\.com/v/([a-zA-Z0-9_-]{11})")
        .unwrap()
        .captures(input)
    {
        return Some(caps[1].to_string());
    }

    None
}
