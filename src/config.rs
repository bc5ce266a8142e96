//! Runtime configuration, built once at startup and shared read-only.
//!
//! Every section has defaults, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! [paths]
//! videos_dir = "/srv/backgrounds"
//!
//! [batch]
//! media = 1
//!
//! [tools]
//! variant = "docker"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{Context, Error, Result};
use crate::redact;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathSettings,
    pub batch: BatchSettings,
    pub tools: ToolSettings,
    pub tts: TtsSettings,
    pub mfa: MfaSettings,
    pub gentle: GentleSettings,
    pub redaction: RedactionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Parent of the per-request working directories.
    pub tmp_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Pool of background `.mp4` files.
    pub videos_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from("./media/tmp"),
            output_dir: PathBuf::from("./media/output"),
            videos_dir: PathBuf::from("./media/input/videos"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub transcript: usize,
    pub tts: usize,
    pub subtitle: usize,
    pub media: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            transcript: 8,
            tts: 2,
            subtitle: 2,
            media: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ToolVariant {
    #[default]
    Local,
    Docker,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AlignerKind {
    #[default]
    Mfa,
    Gentle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub variant: ToolVariant,
    pub aligner: AlignerKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    pub model_name: String,
    pub female_speaker: String,
    pub male_speaker: String,
    pub language: String,
    pub use_cuda: bool,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            model_name: "tts_models/multilingual/multi-dataset/xtts_v2".to_string(),
            female_speaker: "Daisy Studious".to_string(),
            male_speaker: "Damien Black".to_string(),
            language: "en".to_string(),
            use_cuda: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MfaSettings {
    pub beam: u32,
    pub num_jobs: u32,
    pub dictionary: String,
    pub acoustic_model: String,
}

impl Default for MfaSettings {
    fn default() -> Self {
        Self {
            beam: 100,
            num_jobs: 2,
            dictionary: "/mfa/pretrained_models/dictionary/english_us_arpa.dict".to_string(),
            acoustic_model: "/mfa/pretrained_models/acoustic/english_us_arpa.zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GentleSettings {
    pub url: String,
}

impl Default for GentleSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8765/transcriptions?async=false".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedactionSettings {
    pub enabled: bool,
    /// Replaces the built-in table when present.
    pub mappings: Option<HashMap<String, String>>,
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mappings: None,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                let config: Config = toml::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("batch.transcript", self.batch.transcript),
            ("batch.tts", self.batch.tts),
            ("batch.subtitle", self.batch.subtitle),
            ("batch.media", self.batch.media),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(Error::InvalidInput(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.paths.tmp_dir,
            &self.paths.output_dir,
            &self.paths.videos_dir,
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn redactor(&self) -> Box<dyn redact::Redactor> {
        if !self.redaction.enabled {
            return Box::new(redact::NoOpRedactor);
        }
        match &self.redaction.mappings {
            Some(mappings) => Box::new(redact::WordMapRedactor::new(mappings.clone())),
            None => Box::new(redact::WordMapRedactor::new(redact::default_mappings())),
        }
    }
}
