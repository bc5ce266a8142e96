use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::commands::CommandBuilder;
use crate::config::{AlignerKind, Config};
use crate::error::{Context, Error, Result};
use crate::process;
use crate::subtitle::{self, AlignmentEntry, SubtitleCue};
use crate::text;

pub enum Aligner {
    Mfa(MfaAligner),
    Gentle(GentleAligner),
}

impl Aligner {
    pub fn from_config(config: &Config, commands: Arc<dyn CommandBuilder>) -> Self {
        match config.tools.aligner {
            AlignerKind::Mfa => Self::Mfa(MfaAligner::new(commands)),
            AlignerKind::Gentle => Self::Gentle(GentleAligner::new(config.gentle.url.clone())),
        }
    }

    /// Aligns `audio` against the words of `transcript` and writes the cues
    /// to `result` as SubRip. `scratch_dir` is private to this segment.
    pub async fn subtitles(
        &self,
        audio: &Path,
        transcript: &Path,
        scratch_dir: &Path,
        result: &Path,
    ) -> Result<PathBuf> {
        let cues = self
            .cues(audio, transcript, scratch_dir)
            .await
            .inspect_err(|e| {
                error!(
                    "Error generating subtitles - audio file: {} - transcript file: {} - result file: {} - {}",
                    audio.display(),
                    transcript.display(),
                    result.display(),
                    e
                )
            })?;
        subtitle::write_srt(result, &cues).await?;
        info!("Wrote {} cues to {}", cues.len(), result.display());
        Ok(result.to_path_buf())
    }

    async fn cues(
        &self,
        audio: &Path,
        transcript: &Path,
        scratch_dir: &Path,
    ) -> Result<Vec<SubtitleCue>> {
        let content = tokio::fs::read_to_string(transcript)
            .await
            .with_context(|| format!("reading transcript {}", transcript.display()))?;
        let tokens = text::tokenize(&content);

        match self {
            Self::Mfa(mfa) => {
                let entries = mfa.align(audio, &tokens, scratch_dir).await?;
                subtitle::reconcile(&entries, &tokens)
            }
            Self::Gentle(gentle) => {
                let entries = gentle.align(audio, transcript).await?;
                Ok(subtitle::cues_from_entries(&entries))
            }
        }
    }
}

/// Montreal Forced Aligner, run as an external command over a one-file corpus.
pub struct MfaAligner {
    commands: Arc<dyn CommandBuilder>,
}

#[derive(Debug, Deserialize)]
struct MfaOutput {
    tiers: MfaTiers,
}

#[derive(Debug, Deserialize)]
struct MfaTiers {
    words: MfaTier,
}

#[derive(Debug, Deserialize)]
struct MfaTier {
    entries: Vec<(f64, f64, String)>,
}

pub fn parse_mfa_output(raw: &str) -> Result<Vec<AlignmentEntry>> {
    let output: MfaOutput = serde_json::from_str(raw).context("parsing aligner output")?;
    Ok(output
        .tiers
        .words
        .entries
        .into_iter()
        .map(|(start, end, label)| AlignmentEntry { start, end, label })
        .collect())
}

impl MfaAligner {
    pub const TRANSCRIPT_FILE: &'static str = "speaker.txt";
    pub const AUDIO_FILE: &'static str = "speaker.wav";
    pub const OUTPUT_FILE: &'static str = "speaker.json";

    pub fn new(commands: Arc<dyn CommandBuilder>) -> Self {
        Self { commands }
    }

    pub async fn align(
        &self,
        audio: &Path,
        tokens: &[String],
        corpus_dir: &Path,
    ) -> Result<Vec<AlignmentEntry>> {
        tokio::fs::create_dir_all(corpus_dir)
            .await
            .with_context(|| format!("creating corpus dir {}", corpus_dir.display()))?;

        let transcript = corpus_dir.join(Self::TRANSCRIPT_FILE);
        let corpus_audio = corpus_dir.join(Self::AUDIO_FILE);
        tokio::try_join!(
            async {
                tokio::fs::write(&transcript, text::aligner_transcript(tokens))
                    .await
                    .with_context(|| format!("writing {}", transcript.display()))
            },
            async {
                tokio::fs::copy(audio, &corpus_audio)
                    .await
                    .with_context(|| format!("copying {} into corpus", audio.display()))
            },
        )?;

        let command = self.commands.align(corpus_dir);
        process::run(&command).await.inspect_err(|e| {
            if let Error::ExternalCommandFailed {
                exit_code, command, ..
            } = e
            {
                error!(
                    "Mfa failed alignment - exit code: {} - command: {} - audio file: {}",
                    exit_code,
                    command,
                    audio.display()
                );
            }
        })?;

        let output = corpus_dir.join(Self::OUTPUT_FILE);
        let raw = tokio::fs::read_to_string(&output)
            .await
            .with_context(|| format!("reading aligner output {}", output.display()))?;
        let entries = parse_mfa_output(&raw)?;
        debug!(
            "Aligner returned {} entries for {} tokens",
            entries.len(),
            tokens.len()
        );
        Ok(entries)
    }
}

/// Gentle alignment server, reached over HTTP.
pub struct GentleAligner {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GentleResponse {
    words: Vec<GentleWord>,
}

#[derive(Debug, Deserialize)]
struct GentleWord {
    word: String,
    start: Option<f64>,
    end: Option<f64>,
}

/// Words Gentle could not find in the audio carry no timing and are dropped.
pub fn parse_gentle_response(raw: &str) -> Result<Vec<AlignmentEntry>> {
    let response: GentleResponse =
        serde_json::from_str(raw).context("parsing gentle response")?;
    Ok(response
        .words
        .into_iter()
        .filter_map(|w| match (w.start, w.end) {
            (Some(start), Some(end)) => Some(AlignmentEntry::new(start, end, w.word)),
            _ => None,
        })
        .collect())
}

impl GentleAligner {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub async fn align(&self, audio: &Path, transcript: &Path) -> Result<Vec<AlignmentEntry>> {
        let (audio_bytes, transcript_bytes) = tokio::try_join!(
            async {
                tokio::fs::read(audio)
                    .await
                    .with_context(|| format!("reading {}", audio.display()))
            },
            async {
                tokio::fs::read(transcript)
                    .await
                    .with_context(|| format!("reading {}", transcript.display()))
            },
        )?;

        let form = Form::new()
            .part("audio", file_part(audio_bytes, audio, "audio/wav")?)
            .part(
                "transcript",
                file_part(transcript_bytes, transcript, "text/plain")?,
            );

        let body = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("posting to gentle")?
            .text()
            .await
            .context("reading gentle response")?;

        parse_gentle_response(&body)
    }
}

fn file_part(bytes: Vec<u8>, path: &Path, mime: &str) -> Result<Part> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Part::bytes(bytes)
        .file_name(name)
        .mime_str(mime)
        .context("building multipart body")
}
