//! Field capture metadata carried through the queue

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use harvest_queue::NewItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    Voice,
    Photo,
    Note,
}

impl CaptureKind {
    /// Guess from the file extension; anything unrecognised is a note
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("m4a" | "mp3" | "wav" | "ogg" | "opus" | "aac" | "webm") => Self::Voice,
            Some("jpg" | "jpeg" | "png" | "heic" | "webp") => Self::Photo,
            _ => Self::Note,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Photo => "photo",
            Self::Note => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub kind: CaptureKind,
    pub captured_at: DateTime<Utc>,
    /// Suggested filename for the upload
    pub filename: String,
    pub mime_type: String,
    /// Recording length, voice captures only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn mime_type(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg" | "opus") => "audio/ogg",
        Some("aac") => "audio/aac",
        Some("webm") => "audio/webm",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("heic") => "image/heic",
        Some("webp") => "image/webp",
        Some("txt" | "md") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Ids end up in upload URLs, so keep them to a URL-safe alphabet
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Build a queue item for a captured file
pub fn new_capture(
    id: String,
    path: &Path,
    payload: Vec<u8>,
    kind: Option<CaptureKind>,
    duration_secs: Option<f64>,
) -> NewItem<CaptureMetadata> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.clone());

    let metadata = CaptureMetadata {
        kind: kind.unwrap_or_else(|| CaptureKind::from_path(path)),
        captured_at: Utc::now(),
        filename,
        mime_type: mime_type(path).to_string(),
        duration_secs,
    };

    NewItem::new(id, payload, metadata)
}
