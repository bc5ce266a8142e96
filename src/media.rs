use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use tracing::{error, info, warn};

use crate::commands::CommandBuilder;
use crate::error::{Context, Error, Result};
use crate::process;

pub const CONCAT_LIST_FILE: &str = "concat_list.txt";

pub struct MediaEditor {
    commands: Arc<dyn CommandBuilder>,
}

fn log_failure(what: &str, e: &Error, files: &[&Path]) {
    let files: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
    match e {
        Error::ExternalCommandFailed {
            exit_code, command, ..
        } => error!(
            "Ffmpeg failed {} - exit code: {} - command: {} - files: {:?}",
            what, exit_code, command, files
        ),
        other => error!("Error {} - files: {:?} - {}", what, files, other),
    }
}

impl MediaEditor {
    pub fn new(commands: Arc<dyn CommandBuilder>) -> Self {
        Self { commands }
    }

    pub async fn probe_duration(&self, file: &Path) -> Result<f64> {
        let command = self.commands.duration(file);
        let stdout = process::run(&command)
            .await
            .inspect_err(|e| log_failure("getting duration of file", e, &[file]))?;
        parse_duration(&stdout)
    }

    /// One segment clip: the segment's audio plus its subtitles as a text track.
    pub async fn render_clip(&self, audio: &Path, subtitles: &Path, result: &Path) -> Result<PathBuf> {
        let command = self.commands.render(audio, subtitles, result);
        process::run(&command)
            .await
            .inspect_err(|e| log_failure("creating clip", e, &[audio, subtitles, result]))?;
        Ok(result.to_path_buf())
    }

    /// Joins `files` in order. All of them must live in one directory.
    pub async fn concat(&self, files: &[PathBuf], result: &Path) -> Result<PathBuf> {
        let Some(files_dir) = files.first().and_then(|f| f.parent()) else {
            return Err(Error::InvalidInput("nothing to concatenate".to_string()));
        };
        if files.iter().any(|f| f.parent() != Some(files_dir)) {
            return Err(Error::InvalidInput(
                "all files to concat must be in the same directory".to_string(),
            ));
        }

        let list_file = result
            .parent()
            .unwrap_or(files_dir)
            .join(CONCAT_LIST_FILE);
        tokio::fs::write(&list_file, self.commands.concat_list(files))
            .await
            .with_context(|| format!("writing concat list {}", list_file.display()))?;

        let command = self.commands.concat(&list_file, files_dir, result);
        process::run(&command)
            .await
            .inspect_err(|e| log_failure("concatenating files", e, &[list_file.as_path(), result]))?;
        info!("Concatenated {} files into {}", files.len(), result.display());
        Ok(result.to_path_buf())
    }

    /// Lays `narrated` over a random window of `background` that is long
    /// enough to cover it.
    pub async fn compose_final(
        &self,
        narrated: &Path,
        background: &Path,
        result: &Path,
    ) -> Result<PathBuf> {
        let (narrated_secs, background_secs) = tokio::try_join!(
            self.probe_duration(narrated),
            self.probe_duration(background)
        )?;

        let start = pick_start_offset(narrated_secs, background_secs, &mut rand::thread_rng());
        info!(
            "Narration {:.2}s, background {:.2}s, starting background at {}s",
            narrated_secs, background_secs, start
        );

        let command = self.commands.compose(narrated, background, start, result);
        process::run(&command).await.inspect_err(|e| {
            log_failure("creating final video", e, &[narrated, background, result])
        })?;
        Ok(result.to_path_buf())
    }
}

/// A whole-second start point, uniform over `[0, background - narrated]`.
/// A background shorter than the narration starts at 0.
pub fn pick_start_offset<R: Rng>(narrated: f64, background: f64, rng: &mut R) -> u64 {
    let max_start = (background - narrated).floor();
    if max_start.is_nan() || max_start <= 0.0 {
        if background < narrated {
            warn!(
                "Background ({:.2}s) is shorter than narration ({:.2}s)",
                background, narrated
            );
        }
        return 0;
    }
    rng.gen_range(0..=max_start as u64)
}

pub fn parse_duration(stdout: &str) -> Result<f64> {
    let trimmed = stdout.trim();
    match trimmed.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(Error::InvalidInput(format!(
            "unreadable duration `{trimmed}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn start_offset_stays_inside_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let start = pick_start_offset(30.5, 100.0, &mut rng);
            assert!(start <= 69);
        }
    }

    #[test]
    fn start_offset_reaches_both_ends() {
        let mut rng = StdRng::seed_from_u64(11);
        let picks: Vec<u64> = (0..500).map(|_| pick_start_offset(8.0, 10.0, &mut rng)).collect();
        assert!(picks.contains(&0));
        assert!(picks.contains(&2));
    }

    #[test]
    fn degenerate_window_clamps_to_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(pick_start_offset(60.0, 20.0, &mut rng), 0);
        assert_eq!(pick_start_offset(20.0, 20.0, &mut rng), 0);
        assert_eq!(pick_start_offset(20.0, 20.9, &mut rng), 0);
        assert_eq!(pick_start_offset(f64::NAN, 20.0, &mut rng), 0);
    }

    #[test]
    fn parses_ffprobe_duration() {
        assert_eq!(parse_duration("12.480000\n").unwrap(), 12.48);
        assert!(matches!(
            parse_duration("N/A\n"),
            Err(Error::InvalidInput(_))
        ));
        assert!(parse_duration("").is_err());
    }
}
