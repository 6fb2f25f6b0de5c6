use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One trackable media unit. Progress fields mutate in place; `id`, `title`
/// and `source` are fixed at seeding time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Chapter {
    pub(crate) id: u32,
    pub(crate) title: String,
    pub(crate) source: String,
    #[serde(default)]
    pub(crate) duration_seconds: f64,
    #[serde(default)]
    pub(crate) watched: bool,
    #[serde(default)]
    pub(crate) watched_percentage: f64,
    #[serde(default)]
    pub(crate) last_played_time_seconds: f64,
}

impl Chapter {
    pub(crate) fn status_label(&self) -> String {
        if self.watched {
            "Completed".to_string()
        } else {
            format!("{}%", self.watched_percentage.round() as i64)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    title: String,
    source: String,
}

/// Builds the seed collection from a manifest file: a JSON array of
/// `{ "title": ..., "source": ... }` records. Ids are assigned 1-based in
/// manifest order and stay stable for the lifetime of the session database.
pub(crate) fn load_manifest(path: &Path) -> Result<Vec<Chapter>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read chapter manifest at {}", path.display()))?;
    let entries: Vec<ManifestEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse chapter manifest at {}", path.display()))?;
    if entries.is_empty() {
        bail!("chapter manifest at {} lists no chapters", path.display());
    }

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| Chapter {
            id: (idx + 1) as u32,
            title: entry.title,
            source: entry.source,
            duration_seconds: 0.0,
            watched: false,
            watched_percentage: 0.0,
            last_played_time_seconds: 0.0,
        })
        .collect())
}

/// Rejects collections that could not have been written by a healthy session:
/// non-finite or negative numbers, percentages past 100, duplicate ids. A
/// rejected collection is treated like a missing one.
pub(crate) fn validate_chapters(chapters: &[Chapter]) -> bool {
    if chapters.is_empty() {
        return false;
    }

    let mut seen_ids = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        let numbers = [
            chapter.duration_seconds,
            chapter.watched_percentage,
            chapter.last_played_time_seconds,
        ];
        if numbers.iter().any(|n| !n.is_finite() || *n < 0.0) {
            return false;
        }
        if chapter.watched_percentage > 100.0 {
            return false;
        }
        if seen_ids.contains(&chapter.id) {
            return false;
        }
        seen_ids.push(chapter.id);
    }
    true
}

pub(crate) fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    let mins = total / 60;
    let secs = total % 60;
    format!("{mins}:{secs:02}")
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

pub(crate) fn format_updated_display(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M %:z")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}
