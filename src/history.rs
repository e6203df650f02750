//! Exploration history and practice reporting.
//!
//! Each explored word becomes one record in a daily JSONL file under
//! ~/.braille-touch-history/, and `--report` renders a day's practice
//! as Markdown.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error};

fn history_dir() -> PathBuf {
    dirs::home_dir()
        .expect("No home directory")
        .join(".braille-touch-history")
}

fn history_file(date: &str) -> PathBuf {
    let date_str = if date == "today" {
        Local::now().format("%Y-%m-%d").to_string()
    } else {
        date.to_string()
    };
    history_dir().join(format!("{date_str}.jsonl"))
}

/// One explored word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationRecord {
    pub timestamp: String,
    /// The word as dictated (or configured).
    pub source_text: String,
    /// The word actually laid out in Braille.
    pub display_text: String,
    pub translated: bool,
    pub letter_count: usize,
}

impl ExplorationRecord {
    pub fn now(source_text: &str, display_text: &str, translated: bool) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            source_text: source_text.to_string(),
            display_text: display_text.to_string(),
            translated,
            letter_count: display_text.chars().count(),
        }
    }
}

/// Append a record to today's history file.
pub fn save_record(record: &ExplorationRecord) {
    let dir = history_dir();
    if let Err(e) = fs::create_dir_all(&dir) {
        error!("Failed to create history dir: {e}");
        return;
    }

    let path = history_file("today");
    match fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(mut file) => match serde_json::to_string(record) {
            Ok(json) => {
                if let Err(e) = writeln!(file, "{json}") {
                    error!("Failed to write history record: {e}");
                } else {
                    debug!("Saved exploration record to {}", path.display());
                }
            }
            Err(e) => error!("Failed to serialize record: {e}"),
        },
        Err(e) => error!("Failed to open history file: {e}"),
    }
}

/// Load all records for a given date ("today" or YYYY-MM-DD).
pub fn load_records(date: &str) -> Vec<ExplorationRecord> {
    let path = history_file(date);
    if !path.exists() {
        return Vec::new();
    }

    let mut records = Vec::new();
    match fs::File::open(&path) {
        Ok(file) => {
            for line in std::io::BufReader::new(file).lines().map_while(Result::ok) {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ExplorationRecord>(line) {
                    Ok(record) => records.push(record),
                    Err(e) => debug!("Skipping malformed history line: {e}"),
                }
            }
        }
        Err(e) => error!("Failed to load history records: {e}"),
    }

    records
}

/// Render a Markdown practice report for a given date.
pub fn generate_report(date: &str) -> String {
    let records = load_records(date);

    let display_date = if date == "today" {
        Local::now().format("%Y-%m-%d").to_string()
    } else {
        date.to_string()
    };

    if records.is_empty() {
        return format!("# Braille practice - {display_date}\n\nNo words explored.");
    }

    let total_letters: usize = records.iter().map(|r| r.letter_count).sum();
    let translated = records.iter().filter(|r| r.translated).count();
    let mut distinct: Vec<&str> = records.iter().map(|r| r.display_text.as_str()).collect();
    distinct.sort_unstable();
    distinct.dedup();

    let mut lines = vec![
        format!("# Braille practice - {display_date}"),
        String::new(),
        "## Summary".to_string(),
        format!("- **Words explored**: {}", records.len()),
        format!("- **Distinct words**: {}", distinct.len()),
        format!("- **Letters total**: {total_letters}"),
        format!("- **Translated**: {translated}/{}", records.len()),
        String::new(),
        "## Word Log".to_string(),
        String::new(),
        "| Time | Dictated | Explored | Letters |".to_string(),
        "|------|----------|----------|---------|".to_string(),
    ];

    for r in &records {
        let time_str = if r.timestamp.len() >= 19 {
            // HH:MM:SS out of the RFC 3339 timestamp
            &r.timestamp[11..19]
        } else {
            r.timestamp.as_str()
        };
        lines.push(format!(
            "| {time_str} | {} | {} | {} |",
            r.source_text, r.display_text, r.letter_count
        ));
    }

    lines.join("\n")
}
