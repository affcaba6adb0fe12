use anyhow::{Context, Result};
use async_trait::async_trait;
use engine::{AudioGenerationRequest, PipelineError};
use std::time::Duration;
use tracing::info;

/// Text-to-audio generator. Treated as a black box: any failure is a
/// [`PipelineError::Generation`].
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Encoded audio in `request.extension` format.
    async fn synthesize(&self, request: AudioGenerationRequest) -> engine::Result<Vec<u8>>;
}

/// Client for a spectrogram inference server.
///
/// `POST {url}/synthesize` with the request as JSON; the response body is the
/// encoded audio.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    url: String,
}

impl HttpSynthesizer {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build synthesizer HTTP client")?;
        Ok(HttpSynthesizer {
            client,
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: AudioGenerationRequest) -> engine::Result<Vec<u8>> {
        info!(
            prompt = %request.prompt,
            negative_prompt = %request.negative_prompt,
            seed = request.seed,
            inference_steps = request.inference_steps,
            guidance = request.guidance,
            scheduler = ?request.scheduler,
            checkpoint = %request.checkpoint,
            device = ?request.device,
            width = request.width,
            extension = request.extension.as_str(),
            "Starting audio synthesis"
        );

        let response = self
            .client
            .post(format!("{}/synthesize", self.url))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("synthesizer unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!(
                "synthesizer returned {}: {}",
                status,
                body.trim()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Generation(format!("failed to read audio: {}", e)))?;

        info!(bytes = bytes.len(), "Finished audio synthesis");
        Ok(bytes.to_vec())
    }
}
