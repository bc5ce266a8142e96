use std::path::PathBuf;

use clap::{Parser, Subcommand};

use storyreel::config::{AlignerKind, Config, ToolVariant};
use storyreel::Voice;

#[derive(Parser, Debug)]
#[clap(name = "storyreel", about = "Narrated short-form videos from text")]
pub struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(long, global = true)]
    pub tmp_dir: Option<PathBuf>,

    #[clap(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Pool of background `.mp4` files.
    #[clap(long, global = true)]
    pub videos_dir: Option<PathBuf>,

    #[clap(long, global = true, value_enum)]
    pub variant: Option<ToolVariant>,

    #[clap(long, global = true, value_enum)]
    pub aligner: Option<AlignerKind>,

    /// Narrate the text exactly as given.
    #[clap(long, global = true)]
    pub no_redact: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Narrate text passed inline or read from a file.
    Text {
        #[clap(long, value_enum, default_value_t = Voice::Female)]
        voice: Voice,

        #[clap(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        #[clap(required_unless_present = "file")]
        text: Option<String>,
    },
    /// Narrate a reddit post given its permalink.
    Reddit {
        #[clap(long, value_enum, default_value_t = Voice::Female)]
        voice: Voice,

        url: String,
    },
}

impl Args {
    /// Applies command line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.tmp_dir {
            config.paths.tmp_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.paths.output_dir = dir.clone();
        }
        if let Some(dir) = &self.videos_dir {
            config.paths.videos_dir = dir.clone();
        }
        if let Some(variant) = self.variant {
            config.tools.variant = variant;
        }
        if let Some(aligner) = self.aligner {
            config.tools.aligner = aligner;
        }
        if self.no_redact {
            config.redaction.enabled = false;
        }
    }
}
