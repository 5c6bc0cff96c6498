use std::path::PathBuf;

use chrono::{DateTime, Utc};
use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// Most entries the history file keeps, most-recent-first.
pub const MAX_ENTRIES: usize = 20;

/// One produced summary, the only durable state the pipeline writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub video_id: String,
    pub title: String,
    pub summary_text: String,
    pub timestamp: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn new(video_id: &str, title: &str, summary_text: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: title.to_string(),
            summary_text: summary_text.to_string(),
            timestamp: Utc::now(),
        }
    }
}

fn history_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytsum")
        .join("history.json")
}

/// Load the saved history, newest first. A missing or unreadable file is an
/// empty history.
pub fn load() -> Vec<SummaryRecord> {
    let path = history_path();
    let Some(data) = std::fs::read_to_string(&path).ok() else {
        return Vec::new();
    };
    match serde_json::from_str(&data) {
        Ok(records) => {
            debug!("Loaded history: {}", path.display());
            records
        }
        Err(e) => {
            debug!("Discarding unreadable history {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Persist the history list.
pub fn save(records: &[SummaryRecord]) -> Result<()> {
    let path = history_path();
    std::fs::create_dir_all(path.parent().unwrap())?;
    let data = serde_json::to_string_pretty(records)?;
    std::fs::write(&path, data)?;
    debug!("Saved history: {}", path.display());
    Ok(())
}

/// Insert a record at the front. A record for the same video replaces the
/// old entry instead of duplicating it, and the list never grows past
/// [`MAX_ENTRIES`].
pub fn push_record(mut records: Vec<SummaryRecord>, record: SummaryRecord) -> Vec<SummaryRecord> {
    records.retain(|r| r.video_id != record.video_id);
    records.insert(0, record);
    records.truncate(MAX_ENTRIES);
    records
}

/// Append one record to the saved history.
pub fn append(record: SummaryRecord) -> Result<()> {
    let records = push_record(load(), record);
    save(&records)
}
