use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::info;

use crate::error::{Context, Error, Result};

/// Copies a randomly chosen `.mp4` from `videos_dir` to `result`.
pub async fn pick_background(videos_dir: &Path, result: &Path) -> Result<PathBuf> {
    let candidates = list_videos(videos_dir).await?;
    let chosen = candidates
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "no background videos in {}",
                videos_dir.display()
            ))
        })?;

    info!("Using background video {}", chosen.display());
    tokio::fs::copy(&chosen, result)
        .await
        .with_context(|| format!("copying background {}", chosen.display()))?;
    Ok(result.to_path_buf())
}

async fn list_videos(videos_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dir = tokio::fs::read_dir(videos_dir)
        .await
        .with_context(|| format!("listing {}", videos_dir.display()))?;

    let mut videos = Vec::new();
    while let Some(entry) = dir
        .next_entry()
        .await
        .with_context(|| format!("listing {}", videos_dir.display()))?
    {
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
        if is_mp4 && path.is_file() {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}
