use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, MfaSettings, ToolVariant, TtsSettings};
use crate::tts::Voice;

pub trait CommandBuilder: Send + Sync {
    fn synthesis(&self, text: &str, voice: Voice, result: &Path) -> Vec<String>;

    /// Aligns the `speaker.wav`/`speaker.txt` pair in `corpus_dir`, writing
    /// `speaker.json` next to them.
    fn align(&self, corpus_dir: &Path) -> Vec<String>;

    fn duration(&self, file: &Path) -> Vec<String>;

    fn render(&self, audio: &Path, subtitles: &Path, result: &Path) -> Vec<String>;

    fn concat_list(&self, files: &[PathBuf]) -> String;

    fn concat(&self, list_file: &Path, files_dir: &Path, result: &Path) -> Vec<String>;

    fn compose(&self, narrated: &Path, background: &Path, start_seconds: u64, result: &Path)
    -> Vec<String>;
}

pub fn from_config(config: &Config) -> Arc<dyn CommandBuilder> {
    match config.tools.variant {
        ToolVariant::Local => Arc::new(LocalCommands::new(config)),
        ToolVariant::Docker => Arc::new(DockerCommands::new(config)),
    }
}

const SUBTITLE_STYLE: &str =
    "FontName='Lobster Two,Fontsize=28,Alignment=2,MarginV=20,PrimaryColour=&H0000A5FF'";

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("/"))
}

/// A concat demuxer line. Quotes inside the path close, escape and reopen.
fn concat_entry(path: &str) -> String {
    format!("file '{}'", path.replace('\'', "'\\''"))
}

fn strings<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn render_args(audio: &str, subtitles: &str, result: &str) -> Vec<String> {
    strings([
        "-i", audio, "-i", subtitles, "-map", "0:a", "-map", "1:s", "-c:a", "copy", "-c:s",
        "mov_text", "-y", result,
    ])
}

fn duration_args(file: &str) -> Vec<String> {
    strings([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
        file,
    ])
}

fn concat_args(list_file: &str, result: &str) -> Vec<String> {
    strings([
        "-f", "concat", "-safe", "0", "-i", list_file, "-c:v", "copy", "-c:a", "copy", "-c:s",
        "mov_text", "-y", result,
    ])
}

fn compose_args(narrated: &str, background: &str, start_seconds: u64, result: &str) -> Vec<String> {
    let start = start_seconds.to_string();
    let filter = format!("subtitles={narrated}:force_style={SUBTITLE_STYLE}");
    strings([
        "-ss",
        &start,
        "-i",
        background,
        "-i",
        narrated,
        "-map",
        "0:v",
        "-map",
        "1:a",
        "-c:v",
        "libx264",
        "-preset",
        "slow",
        "-crf",
        "20",
        "-movflags",
        "+faststart",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-ac",
        "2",
        "-vf",
        &filter,
        "-shortest",
        "-y",
        result,
    ])
}

fn mfa_align_args(mfa: &MfaSettings, corpus_dir: &str) -> Vec<String> {
    let num_jobs = mfa.num_jobs.to_string();
    let beam = mfa.beam.to_string();
    strings([
        "mfa",
        "align",
        "--single_speaker",
        "--use_mp",
        "--num_jobs",
        &num_jobs,
        "--include_original_text",
        "--fine_tune",
        "--output_format",
        "json",
        corpus_dir,
        &mfa.dictionary,
        &mfa.acoustic_model,
        corpus_dir,
        "--beam",
        &beam,
    ])
}

fn speaker<'a>(tts: &'a TtsSettings, voice: Voice) -> &'a str {
    match voice {
        Voice::Female => &tts.female_speaker,
        Voice::Male => &tts.male_speaker,
    }
}

pub struct LocalCommands {
    tts: TtsSettings,
    mfa: MfaSettings,
}

impl LocalCommands {
    pub fn new(config: &Config) -> Self {
        Self {
            tts: config.tts.clone(),
            mfa: config.mfa.clone(),
        }
    }
}

impl CommandBuilder for LocalCommands {
    fn synthesis(&self, text: &str, voice: Voice, result: &Path) -> Vec<String> {
        let mut cmd = strings([
            "tts",
            "--model_name",
            &self.tts.model_name,
            "--speaker_idx",
            speaker(&self.tts, voice),
            "--language_idx",
            &self.tts.language,
            "--text",
            text,
            "--out_path",
            &path_arg(result),
        ]);
        if self.tts.use_cuda {
            cmd.push("--use_cuda".to_string());
        }
        cmd
    }

    fn align(&self, corpus_dir: &Path) -> Vec<String> {
        mfa_align_args(&self.mfa, &path_arg(corpus_dir))
    }

    fn duration(&self, file: &Path) -> Vec<String> {
        let mut cmd = vec!["ffprobe".to_string()];
        cmd.extend(duration_args(&path_arg(file)));
        cmd
    }

    fn render(&self, audio: &Path, subtitles: &Path, result: &Path) -> Vec<String> {
        let mut cmd = vec!["ffmpeg".to_string()];
        cmd.extend(render_args(
            &path_arg(audio),
            &path_arg(subtitles),
            &path_arg(result),
        ));
        cmd
    }

    fn concat_list(&self, files: &[PathBuf]) -> String {
        files
            .iter()
            .map(|f| concat_entry(&path_arg(f)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn concat(&self, list_file: &Path, _files_dir: &Path, result: &Path) -> Vec<String> {
        let mut cmd = vec!["ffmpeg".to_string()];
        cmd.extend(concat_args(&path_arg(list_file), &path_arg(result)));
        cmd
    }

    fn compose(
        &self,
        narrated: &Path,
        background: &Path,
        start_seconds: u64,
        result: &Path,
    ) -> Vec<String> {
        let mut cmd = vec!["ffmpeg".to_string()];
        cmd.extend(compose_args(
            &path_arg(narrated),
            &path_arg(background),
            start_seconds,
            &path_arg(result),
        ));
        cmd
    }
}

const TTS_IMAGE: &str = "ghcr.io/coqui-ai/tts:latest";
const MFA_IMAGE: &str = "mmcauliffe/montreal-forced-aligner:latest";
const FFMPEG_IMAGE: &str = "lscr.io/linuxserver/ffmpeg:latest";

const TTS_MODELS_VOLUME: &str = "coqui-tts-models-cache";
const MFA_MODELS_VOLUME: &str = "mfa-models-cache";

/// Same tools, each run in a throwaway container. Host paths are bind
/// mounted and every path argument is rewritten to its mount point.
pub struct DockerCommands {
    tts: TtsSettings,
    mfa: MfaSettings,
}

impl DockerCommands {
    const TTS_OUTPUT_DIR: &'static str = "/root/tts-output";
    const CORPUS_DIR: &'static str = "/data";
    const INPUT_DIR: &'static str = "/input";
    const OUTPUT_DIR: &'static str = "/output";
    const LIST_DIR: &'static str = "/tmp";

    pub fn new(config: &Config) -> Self {
        Self {
            tts: config.tts.clone(),
            mfa: config.mfa.clone(),
        }
    }

    fn input(path: &Path) -> String {
        format!("{}/{}", Self::INPUT_DIR, file_name(path))
    }

    fn output(path: &Path) -> String {
        format!("{}/{}", Self::OUTPUT_DIR, file_name(path))
    }

    fn mount(host: &Path, container: &str) -> [String; 2] {
        ["-v".to_string(), format!("{}:{}", host.display(), container)]
    }

    fn ffmpeg_run(mounts: Vec<[String; 2]>, entrypoint: Option<&str>) -> Vec<String> {
        let mut cmd = strings(["docker", "run", "--rm"]);
        cmd.extend(mounts.into_iter().flatten());
        if let Some(entrypoint) = entrypoint {
            cmd.push("--entrypoint".to_string());
            cmd.push(entrypoint.to_string());
        }
        cmd.push(FFMPEG_IMAGE.to_string());
        cmd
    }
}

impl CommandBuilder for DockerCommands {
    fn synthesis(&self, text: &str, voice: Voice, result: &Path) -> Vec<String> {
        let mut cmd = strings(["docker", "run", "--rm", "-e", "COQUI_TOS_AGREED=1"]);
        cmd.extend(Self::mount(
            Path::new(TTS_MODELS_VOLUME),
            "/root/.local/share/tts",
        ));
        cmd.extend(Self::mount(parent(result), Self::TTS_OUTPUT_DIR));
        if self.tts.use_cuda {
            cmd.extend(strings(["--gpus", "all"]));
        }
        let out_path = format!("{}/{}", Self::TTS_OUTPUT_DIR, file_name(result));
        let use_cuda = self.tts.use_cuda.to_string();
        cmd.extend(strings([
            TTS_IMAGE,
            "--model_name",
            &self.tts.model_name,
            "--speaker_idx",
            speaker(&self.tts, voice),
            "--language_idx",
            &self.tts.language,
            "--text",
            text,
            "--out_path",
            &out_path,
            "--use_cuda",
            &use_cuda,
        ]));
        cmd
    }

    fn align(&self, corpus_dir: &Path) -> Vec<String> {
        let mut cmd = strings(["docker", "run", "--rm"]);
        cmd.extend(Self::mount(
            Path::new(MFA_MODELS_VOLUME),
            "/mfa/pretrained_models",
        ));
        cmd.extend(Self::mount(corpus_dir, Self::CORPUS_DIR));
        cmd.push(MFA_IMAGE.to_string());
        cmd.extend(mfa_align_args(&self.mfa, Self::CORPUS_DIR));
        cmd
    }

    fn duration(&self, file: &Path) -> Vec<String> {
        let container_file = Self::input(file);
        let mut cmd = Self::ffmpeg_run(
            vec![Self::mount(file, &container_file)],
            Some("ffprobe"),
        );
        cmd.extend(duration_args(&container_file));
        cmd
    }

    fn render(&self, audio: &Path, subtitles: &Path, result: &Path) -> Vec<String> {
        let container_audio = Self::input(audio);
        let container_subtitles = Self::input(subtitles);
        let container_result = Self::output(result);
        let mut cmd = Self::ffmpeg_run(
            vec![
                Self::mount(audio, &container_audio),
                Self::mount(subtitles, &container_subtitles),
                Self::mount(parent(result), Self::OUTPUT_DIR),
            ],
            None,
        );
        cmd.extend(render_args(
            &container_audio,
            &container_subtitles,
            &container_result,
        ));
        cmd
    }

    fn concat_list(&self, files: &[PathBuf]) -> String {
        files
            .iter()
            .map(|f| {
                let dir = file_name(parent(f));
                concat_entry(&format!("{}/{}/{}", Self::INPUT_DIR, dir, file_name(f)))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn concat(&self, list_file: &Path, files_dir: &Path, result: &Path) -> Vec<String> {
        let container_files_dir = format!("{}/{}", Self::INPUT_DIR, file_name(files_dir));
        let container_list = format!("{}/{}", Self::LIST_DIR, file_name(list_file));
        let mut cmd = Self::ffmpeg_run(
            vec![
                Self::mount(files_dir, &container_files_dir),
                Self::mount(list_file, &container_list),
                Self::mount(parent(result), Self::OUTPUT_DIR),
            ],
            None,
        );
        cmd.extend(concat_args(&container_list, &Self::output(result)));
        cmd
    }

    fn compose(
        &self,
        narrated: &Path,
        background: &Path,
        start_seconds: u64,
        result: &Path,
    ) -> Vec<String> {
        let container_narrated = Self::input(narrated);
        let container_background = Self::input(background);
        let mut cmd = Self::ffmpeg_run(
            vec![
                Self::mount(narrated, &container_narrated),
                Self::mount(background, &container_background),
                Self::mount(parent(result), Self::OUTPUT_DIR),
            ],
            None,
        );
        cmd.extend(compose_args(
            &container_narrated,
            &container_background,
            start_seconds,
            &Self::output(result),
        ));
        cmd
    }
}
