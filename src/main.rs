mod args;

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing::{error, info};

use storyreel::config::Config;
use storyreel::{logging, reddit, Pipeline, Request};

use crate::args::{Args, Command};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        error!("Content creation failed: {:#}", e);
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.ensure_dirs()?;
    let config = Arc::new(config);

    let request = match &args.command {
        Command::Text { voice, file, text } => {
            let text = match (file, text) {
                (Some(path), _) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, Some(text)) => text.clone(),
                (None, None) => anyhow::bail!("no text given"),
            };
            Request::new(text, *voice)
        }
        Command::Reddit { voice, url } => {
            let post = reddit::fetch_post(url).await?;
            info!("Narrating '{}' by {}", post.title, post.author);
            Request::new(post.narration(), *voice)
        }
    };

    info!(
        request_id = %request.id,
        variant = ?config.tools.variant,
        aligner = ?config.tools.aligner,
        "Starting storyreel pipeline"
    );

    let pipeline = Pipeline::new(config);
    let output = pipeline.run(&request).await?;
    println!("{}", output.display());
    Ok(())
}
