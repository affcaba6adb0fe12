//! In-process stand-ins for ffmpeg and the inference server.

use async_trait::async_trait;
use engine::interval::ClipInterval;
use engine::render::AudioSource;
use engine::{AudioGenerationRequest, PipelineError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::media::{Codec, MediaInfo};
use crate::synth::Synthesizer;

/// Writes a small text file per clip describing which audio it was given:
/// `clip=<index>;audio=original` or `clip=<index>;audio=replaced:<audio bytes>`.
pub struct FakeCodec {
    duration: f64,
    fail_at: Option<usize>,
    encodes: AtomicUsize,
}

impl FakeCodec {
    pub fn new(duration: f64) -> Self {
        FakeCodec {
            duration,
            fail_at: None,
            encodes: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Codec for FakeCodec {
    async fn probe(&self, _path: &Path) -> engine::Result<MediaInfo> {
        Ok(MediaInfo {
            duration_seconds: self.duration,
            fps_num: 30,
            fps_den: 1,
            width: 640,
            height: 360,
            has_audio: true,
        })
    }

    async fn encode_clip(
        &self,
        _source: &Path,
        interval: &ClipInterval,
        audio: &AudioSource,
        output: &Path,
    ) -> engine::Result<()> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(interval.index) {
            return Err(PipelineError::Codec(format!(
                "fake encoder failed on clip {}",
                interval.index
            )));
        }
        let audio = match audio {
            AudioSource::Original => "original".to_string(),
            AudioSource::Replaced(path) => format!(
                "replaced:{}",
                String::from_utf8_lossy(&std::fs::read(path).unwrap_or_default())
            ),
        };
        let body = format!("clip={};audio={}", interval.index, audio);
        tokio::fs::write(output, body)
            .await
            .map_err(|e| PipelineError::io("fake encode", e))
    }
}

pub struct FakeSynth {
    result: Result<Vec<u8>, String>,
    fail_next: Mutex<Option<String>>,
    calls: AtomicUsize,
    last: Mutex<Option<AudioGenerationRequest>>,
}

impl FakeSynth {
    pub fn ok(audio: Vec<u8>) -> Self {
        FakeSynth {
            result: Ok(audio),
            fail_next: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn failing(reason: &str) -> Self {
        FakeSynth {
            result: Err(reason.to_string()),
            fail_next: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    /// Fails the first call with `reason`, then returns `audio`.
    pub fn failing_once(reason: &str, audio: Vec<u8>) -> Self {
        let synth = FakeSynth::ok(audio);
        *synth.fail_next.lock().unwrap() = Some(reason.to_string());
        synth
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AudioGenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for FakeSynth {
    async fn synthesize(&self, request: AudioGenerationRequest) -> engine::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request);
        let transient = self.fail_next.lock().unwrap().take();
        if let Some(reason) = transient {
            return Err(PipelineError::Generation(reason));
        }
        self.result.clone().map_err(PipelineError::Generation)
    }
}
