use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;

mod api;
mod config;
mod media;
mod pipeline;
mod runs;
mod synth;
mod workspace;

use config::Settings;
use media::ffmpeg::FFmpegWrapper;
use pipeline::Pipeline;
use runs::RunManager;
use synth::HttpSynthesizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    tracing_subscriber::fmt()
        .with_max_level(settings.level_filter())
        .init();

    std::fs::create_dir_all(&settings.workspace_root).with_context(|| {
        format!(
            "Failed to create workspace root {}",
            settings.workspace_root.display()
        )
    })?;
    info!("Workspace root at {:?}", settings.workspace_root);

    let codec = Arc::new(FFmpegWrapper::new(
        settings.ffmpeg_bin.clone(),
        settings.ffprobe_bin.clone(),
    ));
    let synth = Arc::new(HttpSynthesizer::new(
        &settings.synthesizer.url,
        Duration::from_secs(settings.synthesizer.timeout_secs),
    )?);
    info!("Synthesizer at {}", settings.synthesizer.url);

    let pipeline = Pipeline::new(codec, synth, settings.encode_concurrency);
    let settings = Arc::new(settings);
    let runs = Arc::new(RunManager::new(settings.clone(), pipeline));

    let app = api::app(runs, settings.max_upload_bytes);

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind_addr {}", settings.bind_addr))?;
    info!("Starting riffcut daemon on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
