use std::path::{Path, PathBuf};

/// File names inside one request's working directory.
///
/// Every per-segment path is derived from the segment index, so concurrent
/// units of the same stage never write to the same file.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn original_transcript(&self) -> PathBuf {
        self.root.join("original_transcript.txt")
    }

    pub fn transcript_part(&self, i: usize) -> PathBuf {
        self.root.join(format!("transcript_part{i}.txt"))
    }

    pub fn audio_part(&self, i: usize) -> PathBuf {
        self.root.join(format!("audio_part{i}.wav"))
    }

    pub fn subtitles_part(&self, i: usize) -> PathBuf {
        self.root.join(format!("subtitles_part{i}.srt"))
    }

    pub fn align_scratch(&self, i: usize) -> PathBuf {
        self.root.join(format!("align_part{i}"))
    }

    pub fn clip_part(&self, i: usize) -> PathBuf {
        self.root.join(format!("tmp_video_part{i}.mp4"))
    }

    pub fn narrated_video(&self) -> PathBuf {
        self.root.join("tmp_video.mp4")
    }

    pub fn background_video(&self) -> PathBuf {
        self.root.join("video_visuals.mp4")
    }
}

pub fn output_video(output_dir: &Path, request_id: &str) -> PathBuf {
    output_dir.join(format!("{request_id}.mp4"))
}
