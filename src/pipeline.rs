use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::align::Aligner;
use crate::background;
use crate::batch;
use crate::commands::{self, CommandBuilder};
use crate::config::Config;
use crate::error::{Context, Error, Result};
use crate::layout::{self, WorkDir};
use crate::media::MediaEditor;
use crate::redact::Redactor;
use crate::text::{self, Segment};
use crate::tts::{Synthesizer, Voice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initialized,
    RedactedTranscriptWritten,
    Segmented,
    Synthesized,
    Aligned,
    ClipsRendered,
    Concatenated,
    Assembled,
    Completed,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialized => "initialization",
            Self::RedactedTranscriptWritten => "transcript",
            Self::Segmented => "segmentation",
            Self::Synthesized => "synthesis",
            Self::Aligned => "alignment",
            Self::ClipsRendered => "clip rendering",
            Self::Concatenated => "concatenation",
            Self::Assembled => "final assembly",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    /// Names the working directory and the output file.
    pub id: String,
    pub text: String,
    pub voice: Voice,
}

impl Request {
    pub fn new(text: impl Into<String>, voice: Voice) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            voice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageArtifact {
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentAudio {
    pub index: usize,
    pub transcript: PathBuf,
    pub audio: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSubtitles {
    pub index: usize,
    pub audio: PathBuf,
    pub subtitles: PathBuf,
}

/// Where a run currently is. Failures are attributed to the stage being attempted.
#[derive(Debug)]
pub struct RunState {
    request_id: String,
    stage: Stage,
}

impl RunState {
    fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            stage: Stage::Initialized,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        info!(request_id = %self.request_id, "{} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, attempted: Stage, source: Error) -> Error {
        error!(
            request_id = %self.request_id,
            stage = %attempted,
            "Error processing creation of content: {}",
            source
        );
        self.stage = Stage::Failed;
        Error::PipelineFailed {
            request_id: self.request_id.clone(),
            stage: attempted,
            source: Box::new(source),
        }
    }

    async fn step<T>(&mut self, target: Stage, work: impl Future<Output = Result<T>>) -> Result<T> {
        match work.await {
            Ok(value) => {
                self.advance(target);
                Ok(value)
            }
            Err(e) => Err(self.fail(target, e)),
        }
    }
}

async fn run_batch<T, F>(name: &'static str, units: Vec<F>, limit: usize) -> Result<Vec<T>>
where
    F: Future<Output = Result<T>>,
{
    batch::run_all(units, limit)
        .await
        .map_err(|failure| Error::BatchFailed {
            batch: name,
            index: failure.index,
            source: Box::new(failure.source),
        })
}

pub struct Pipeline {
    config: Arc<Config>,
    redactor: Box<dyn Redactor>,
    synthesizer: Synthesizer,
    aligner: Aligner,
    media: MediaEditor,
}

impl Pipeline {
    pub fn new(config: Arc<Config>) -> Self {
        let commands = commands::from_config(&config);
        Self::with_commands(config, commands)
    }

    pub fn with_commands(config: Arc<Config>, commands: Arc<dyn CommandBuilder>) -> Self {
        Self {
            redactor: config.redactor(),
            synthesizer: Synthesizer::new(Arc::clone(&commands)),
            aligner: Aligner::from_config(&config, Arc::clone(&commands)),
            media: MediaEditor::new(commands),
            config,
        }
    }

    pub fn with_redactor(mut self, redactor: Box<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    pub async fn run(&self, request: &Request) -> Result<PathBuf> {
        let mut run = RunState::new(&request.id);
        info!(request_id = %request.id, "Starting content creation");

        let (work, redacted) = run
            .step(Stage::RedactedTranscriptWritten, self.prepare(request))
            .await?;

        let segments = run
            .step(Stage::Segmented, async {
                let segments = text::split_into_sentences(&redacted);
                if segments.is_empty() {
                    return Err(Error::InvalidInput(
                        "text has no speakable sentences".to_string(),
                    ));
                }
                info!(request_id = %request.id, "Split text into {} segments", segments.len());
                Ok(segments)
            })
            .await?;

        let spoken = run
            .step(
                Stage::Synthesized,
                self.transcribe_and_synthesize(&work, &segments, request.voice),
            )
            .await?;

        let subtitled = run
            .step(Stage::Aligned, self.align_all(&work, &spoken))
            .await?;

        let clips = run
            .step(Stage::ClipsRendered, self.render_all(&work, &subtitled))
            .await?;

        let files: Vec<PathBuf> = clips.into_iter().map(|c| c.path).collect();
        let narrated = run
            .step(
                Stage::Concatenated,
                self.media.concat(&files, &work.narrated_video()),
            )
            .await?;

        let output = run
            .step(Stage::Assembled, self.assemble(&work, &narrated, &request.id))
            .await?;

        run.advance(Stage::Completed);
        info!(request_id = %request.id, "Final video written to {}", output.display());
        Ok(output)
    }

    async fn prepare(&self, request: &Request) -> Result<(WorkDir, String)> {
        let root = std::path::absolute(self.config.paths.tmp_dir.join(&request.id))
            .context("resolving request directory")?;
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("creating {}", root.display()))?;
        let work = WorkDir::new(root);

        let original = work.original_transcript();
        let ((), redacted) = tokio::try_join!(
            async {
                tokio::fs::write(&original, &request.text)
                    .await
                    .with_context(|| format!("writing {}", original.display()))
            },
            async { Ok::<_, Error>(self.redactor.redact(&request.text)) },
        )?;
        Ok((work, redacted))
    }

    async fn transcribe_and_synthesize(
        &self,
        work: &WorkDir,
        segments: &[Segment],
        voice: Voice,
    ) -> Result<Vec<SegmentAudio>> {
        let transcripts = segments.iter().map(|s| {
            let path = work.transcript_part(s.index);
            async move {
                tokio::fs::write(&path, &s.text)
                    .await
                    .with_context(|| format!("writing transcript {}", path.display()))?;
                Ok::<_, Error>(StageArtifact {
                    index: s.index,
                    path,
                })
            }
        });
        let audio = segments.iter().map(|s| {
            let path = work.audio_part(s.index);
            async move {
                let path = self.synthesizer.synthesize(&s.text, voice, &path).await?;
                Ok::<_, Error>(StageArtifact {
                    index: s.index,
                    path,
                })
            }
        });

        let batch = &self.config.batch;
        let (transcripts, audio) = tokio::try_join!(
            run_batch("transcript", transcripts.collect(), batch.transcript),
            run_batch("synthesis", audio.collect(), batch.tts),
        )?;

        Ok(transcripts
            .into_iter()
            .zip(audio)
            .map(|(t, a)| {
                debug_assert_eq!(t.index, a.index);
                SegmentAudio {
                    index: t.index,
                    transcript: t.path,
                    audio: a.path,
                }
            })
            .collect())
    }

    async fn align_all(
        &self,
        work: &WorkDir,
        spoken: &[SegmentAudio],
    ) -> Result<Vec<SegmentSubtitles>> {
        let units = spoken
            .iter()
            .map(|s| {
                let scratch = work.align_scratch(s.index);
                let result = work.subtitles_part(s.index);
                async move {
                    let subtitles = self
                        .aligner
                        .subtitles(&s.audio, &s.transcript, &scratch, &result)
                        .await?;
                    Ok::<_, Error>(SegmentSubtitles {
                        index: s.index,
                        audio: s.audio.clone(),
                        subtitles,
                    })
                }
            })
            .collect();
        run_batch("subtitle", units, self.config.batch.subtitle).await
    }

    async fn render_all(
        &self,
        work: &WorkDir,
        subtitled: &[SegmentSubtitles],
    ) -> Result<Vec<StageArtifact>> {
        let units = subtitled
            .iter()
            .map(|s| {
                let result = work.clip_part(s.index);
                async move {
                    let path = self
                        .media
                        .render_clip(&s.audio, &s.subtitles, &result)
                        .await?;
                    Ok::<_, Error>(StageArtifact {
                        index: s.index,
                        path,
                    })
                }
            })
            .collect();
        run_batch("clip", units, self.config.batch.media).await
    }

    async fn assemble(&self, work: &WorkDir, narrated: &Path, request_id: &str) -> Result<PathBuf> {
        let output_dir = std::path::absolute(&self.config.paths.output_dir)
            .context("resolving output directory")?;
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("creating {}", output_dir.display()))?;

        let visuals =
            background::pick_background(&self.config.paths.videos_dir, &work.background_video())
                .await?;
        let output = layout::output_video(&output_dir, request_id);
        self.media.compose_final(narrated, &visuals, &output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_read_as_prose() {
        assert_eq!(Stage::Synthesized.to_string(), "synthesis");
        assert_eq!(Stage::Assembled.to_string(), "final assembly");
    }

    #[test]
    fn requests_get_unique_ids() {
        let a = Request::new("one", Voice::Female);
        let b = Request::new("one", Voice::Female);
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[tokio::test]
    async fn failed_step_is_wrapped_with_attempted_stage() {
        let mut run = RunState::new("req-1");
        run.step(Stage::RedactedTranscriptWritten, async { Ok(()) })
            .await
            .unwrap();

        let err = run
            .step(Stage::Segmented, async {
                Err::<(), _>(Error::InvalidInput("empty".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(run.stage(), Stage::Failed);
        match err {
            Error::PipelineFailed {
                request_id, stage, ..
            } => {
                assert_eq!(request_id, "req-1");
                assert_eq!(stage, Stage::Segmented);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_failure_keeps_kind_and_index() {
        let units: Vec<_> = (0..3)
            .map(|i| async move {
                if i == 2 {
                    Err(Error::AlignmentReconciliationIncomplete {
                        consumed: 0,
                        total: 1,
                        tokens: 2,
                    })
                } else {
                    Ok(i)
                }
            })
            .collect();

        let err = run_batch("subtitle", units, 2).await.unwrap_err();
        match &err {
            Error::BatchFailed { batch, index, .. } => {
                assert_eq!(*batch, "subtitle");
                assert_eq!(*index, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            err.root(),
            Error::AlignmentReconciliationIncomplete { .. }
        ));
    }
}
