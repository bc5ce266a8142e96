use std::path::{Path, PathBuf};
use std::sync::Arc;

use storyreel::config::Config;
use storyreel::pipeline::Stage;
use storyreel::{CommandBuilder, Error, Pipeline, Request, Voice};
use tempfile::TempDir;

/// Writes one word per entry into `speaker.json`, half a second each,
/// splitting hyphenated words the way a real aligner does.
const FAKE_ALIGN: &str = r#"cd "$1" || exit 2
i=0
out=''
sep=''
for w in $(tr '-' ' ' < speaker.txt); do
  out="$out$sep[$i.0,$i.5,\"$w\"]"
  sep=','
  i=$((i+1))
done
printf '{"tiers":{"words":{"entries":[%s]}}}' "$out" > speaker.json
"#;

/// Real processes standing in for the media tools.
struct StubCommands {
    fixture_wav: PathBuf,
    synthesis_fails: bool,
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl CommandBuilder for StubCommands {
    fn synthesis(&self, _text: &str, _voice: Voice, result: &Path) -> Vec<String> {
        if self.synthesis_fails {
            return vec![
                "sh".into(),
                "-c".into(),
                "echo 'no voice model' >&2; exit 7".into(),
            ];
        }
        vec!["cp".into(), arg(&self.fixture_wav), arg(result)]
    }

    fn align(&self, corpus_dir: &Path) -> Vec<String> {
        vec![
            "sh".into(),
            "-c".into(),
            FAKE_ALIGN.into(),
            "sh".into(),
            arg(corpus_dir),
        ]
    }

    fn duration(&self, _file: &Path) -> Vec<String> {
        vec!["echo".into(), "12.5".into()]
    }

    fn render(&self, audio: &Path, _subtitles: &Path, result: &Path) -> Vec<String> {
        vec!["cp".into(), arg(audio), arg(result)]
    }

    fn concat_list(&self, files: &[PathBuf]) -> String {
        files
            .iter()
            .map(|f| format!("file '{}'\n", f.display()))
            .collect()
    }

    fn concat(&self, list_file: &Path, _files_dir: &Path, result: &Path) -> Vec<String> {
        vec!["cp".into(), arg(list_file), arg(result)]
    }

    fn compose(
        &self,
        narrated: &Path,
        _background: &Path,
        _start_seconds: u64,
        result: &Path,
    ) -> Vec<String> {
        vec!["cp".into(), arg(narrated), arg(result)]
    }
}

struct Harness {
    root: TempDir,
    config: Config,
    commands: Arc<StubCommands>,
}

impl Harness {
    fn new(with_background: bool, synthesis_fails: bool) -> Self {
        let root = tempfile::tempdir().unwrap();
        let fixture_wav = root.path().join("fixture.wav");
        write_silence(&fixture_wav);

        let mut config = Config::default();
        config.paths.tmp_dir = root.path().join("tmp");
        config.paths.output_dir = root.path().join("output");
        config.paths.videos_dir = root.path().join("videos");
        config.ensure_dirs().unwrap();
        if with_background {
            std::fs::write(config.paths.videos_dir.join("bg.mp4"), b"background").unwrap();
        }

        Self {
            root,
            config,
            commands: Arc::new(StubCommands {
                fixture_wav,
                synthesis_fails,
            }),
        }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::with_commands(Arc::new(self.config.clone()), self.commands.clone())
    }

    fn request_dir(&self, request: &Request) -> PathBuf {
        self.root.path().join("tmp").join(&request.id)
    }
}

fn write_silence(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..16000 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn two_segments_produce_paired_artifacts_and_output() {
    let harness = Harness::new(true, false);
    let request = Request::new("They wanted to kill time. Then they went home.", Voice::Male);

    let output = harness.pipeline().run(&request).await.unwrap();

    assert_eq!(
        output,
        harness
            .root
            .path()
            .join("output")
            .join(format!("{}.mp4", request.id))
    );
    assert!(output.is_file());

    let dir = harness.request_dir(&request);
    for i in 0..2 {
        assert!(dir.join(format!("transcript_part{i}.txt")).is_file());
        assert!(dir.join(format!("audio_part{i}.wav")).is_file());
        assert!(dir.join(format!("subtitles_part{i}.srt")).is_file());
        assert!(dir.join(format!("tmp_video_part{i}.mp4")).is_file());
    }
    assert!(!dir.join("audio_part2.wav").exists());
    assert!(dir.join("tmp_video.mp4").is_file());
    assert!(dir.join("video_visuals.mp4").is_file());

    let original = std::fs::read_to_string(dir.join("original_transcript.txt")).unwrap();
    assert_eq!(original, request.text);

    let first = std::fs::read_to_string(dir.join("transcript_part0.txt")).unwrap();
    assert_eq!(first, "They wanted to person-delete time");

    let srt = std::fs::read_to_string(dir.join("subtitles_part0.srt")).unwrap();
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:00,500\nThey\n"));
    assert!(srt.contains("4\n00:00:03,000 --> 00:00:04,500\nperson-delete\n"));
    assert!(srt.contains("5\n00:00:05,000 --> 00:00:05,500\ntime\n"));

    let second = std::fs::read_to_string(dir.join("subtitles_part1.srt")).unwrap();
    assert!(second.contains("4\n00:00:03,000 --> 00:00:03,500\nhome\n"));

    let list = std::fs::read_to_string(dir.join("concat_list.txt")).unwrap();
    let part0 = list.find("tmp_video_part0.mp4").unwrap();
    let part1 = list.find("tmp_video_part1.mp4").unwrap();
    assert!(part0 < part1);
}

#[tokio::test]
async fn failed_synthesis_is_attributed_to_its_stage() {
    let harness = Harness::new(true, true);
    let request = Request::new("One sentence. Another one.", Voice::Female);

    let err = harness.pipeline().run(&request).await.unwrap_err();

    match &err {
        Error::PipelineFailed {
            request_id, stage, ..
        } => {
            assert_eq!(request_id, &request.id);
            assert_eq!(*stage, Stage::Synthesized);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    match err.root() {
        Error::ExternalCommandFailed {
            exit_code, stderr, ..
        } => {
            assert_eq!(*exit_code, 7);
            assert!(stderr.contains("no voice model"));
        }
        other => panic!("unexpected root cause: {other:?}"),
    }
    assert!(!harness
        .root
        .path()
        .join("output")
        .join(format!("{}.mp4", request.id))
        .exists());
}

#[tokio::test]
async fn empty_background_pool_fails_final_assembly() {
    let harness = Harness::new(false, false);
    let request = Request::new("Just one line", Voice::Female);

    let err = harness.pipeline().run(&request).await.unwrap_err();

    assert!(matches!(
        err,
        Error::PipelineFailed {
            stage: Stage::Assembled,
            ..
        }
    ));
    assert!(matches!(err.root(), Error::InvalidInput(_)));
    assert!(harness.request_dir(&request).join("tmp_video.mp4").is_file());
}

#[tokio::test]
async fn text_without_sentences_is_rejected() {
    let harness = Harness::new(true, false);
    let request = Request::new(" . \n . ", Voice::Female);

    let err = harness.pipeline().run(&request).await.unwrap_err();

    assert!(matches!(
        err,
        Error::PipelineFailed {
            stage: Stage::Segmented,
            ..
        }
    ));
}
