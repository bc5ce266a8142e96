use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::audio::wav_duration_seconds;
use crate::commands::CommandBuilder;
use crate::error::{Context, Error, Result};
use crate::process;

/// Which narrator speaks the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Female,
    Male,
}

pub struct Synthesizer {
    commands: Arc<dyn CommandBuilder>,
}

impl Synthesizer {
    pub fn new(commands: Arc<dyn CommandBuilder>) -> Self {
        Self { commands }
    }

    /// Speaks `text` into the WAV file at `result`.
    pub async fn synthesize(&self, text: &str, voice: Voice, result: &Path) -> Result<PathBuf> {
        let command = self.commands.synthesis(text, voice, result);
        if let Err(e) = process::run(&command).await {
            if let Error::ExternalCommandFailed {
                exit_code, command, ..
            } = &e
            {
                error!(
                    "TTS failed to synthesize speech - exit code: {} - command: {} - text: \"{}\" - result file: {}",
                    exit_code,
                    command,
                    text,
                    result.display()
                );
            }
            return Err(e);
        }

        let wav = result.to_path_buf();
        let duration = tokio::task::spawn_blocking(move || wav_duration_seconds(&wav))
            .await
            .context("reading synthesized WAV")??;
        info!(
            "Synthesized {} ({:.2}s, {} chars)",
            result.display(),
            duration,
            text.chars().count()
        );
        debug!("Synthesized text: {}", text);
        Ok(result.to_path_buf())
    }
}
