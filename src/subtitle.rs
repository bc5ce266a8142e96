use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use crate::error::{Context, Error, Result};

/// Label the aligner uses for stretches without speech.
pub const SILENCE_LABEL: &str = "<eps>";

/// One timed unit emitted by a forced aligner, in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentEntry {
    pub start: f64,
    pub end: f64,
    pub label: String,
}

impl AlignmentEntry {
    pub fn new(start: f64, end: f64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    fn is_silence(&self) -> bool {
        self.label == SILENCE_LABEL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    /// 1-based.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// One cue per token. Silence is skipped while looking for a token's entry;
/// a hyphenated token whose entry label differs absorbs one more entry.
/// Every entry must be consumed.
pub fn reconcile(entries: &[AlignmentEntry], tokens: &[String]) -> Result<Vec<SubtitleCue>> {
    let incomplete = |consumed: usize| Error::AlignmentReconciliationIncomplete {
        consumed,
        total: entries.len(),
        tokens: tokens.len(),
    };

    let mut cursor = 0;
    let mut cues = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        let candidate = loop {
            let entry = entries.get(cursor).ok_or_else(|| incomplete(cursor))?;
            cursor += 1;
            if !entry.is_silence() {
                break entry;
            }
        };

        let mut end = candidate.end;
        if has_internal_hyphen(token) && candidate.label != *token {
            let rest = entries.get(cursor).ok_or_else(|| incomplete(cursor))?;
            debug!(
                "Merging split token '{}' from '{}' and '{}'",
                token, candidate.label, rest.label
            );
            end = rest.end;
            cursor += 1;
        }

        cues.push(SubtitleCue {
            index: i + 1,
            start: candidate.start,
            end,
            text: token.clone(),
        });
    }

    if cursor != entries.len() {
        return Err(incomplete(cursor));
    }
    Ok(cues)
}

/// One cue per entry, in order. For aligners that already return exactly
/// one timed word per expected token.
pub fn cues_from_entries(entries: &[AlignmentEntry]) -> Vec<SubtitleCue> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| SubtitleCue {
            index: i + 1,
            start: e.start,
            end: e.end,
            text: e.label.clone(),
        })
        .collect()
}

fn has_internal_hyphen(token: &str) -> bool {
    token.trim_matches('-').contains('-')
}

/// Renders cues in SubRip layout.
pub fn to_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        let _ = writeln!(out, "{}", cue.index);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_srt_time(cue.start),
            format_srt_time(cue.end)
        );
        let _ = writeln!(out, "{}", cue.text);
        let _ = writeln!(out);
    }
    out
}

pub async fn write_srt(path: &Path, cues: &[SubtitleCue]) -> Result<()> {
    tokio::fs::write(path, to_srt(cues))
        .await
        .with_context(|| format!("writing subtitles to {}", path.display()))
}

/// `HH:MM:SS,mmm`, truncated to the millisecond.
pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0) as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}
