// Shared test doubles for the camera and encoder capabilities

#![allow(dead_code)]

use anyhow::Result;
use capture_booth::{
    CameraBackend, CaptureSession, EncodedChunk, EncoderFactory, FacingMode, MediaDeviceInfo,
    SessionConfig, SyntheticCamera, SyntheticConfig, SyntheticDevice, VideoConstraints,
    VideoEncoder, VideoSource,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Encoder that emits a fixed list of chunks on start and an optional
/// final chunk on stop
pub struct ScriptedEncoder {
    chunks: Vec<Vec<u8>>,
    final_chunk: Option<Vec<u8>>,
    mime_type: String,
    tx: Option<mpsc::Sender<EncodedChunk>>,
}

impl ScriptedEncoder {
    pub fn new(chunks: &[&str], final_chunk: Option<&str>) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            final_chunk: final_chunk.map(|c| c.as_bytes().to_vec()),
            mime_type: "video/webm".to_string(),
            tx: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = mime_type.to_string();
        self
    }

    pub fn silent() -> Self {
        Self::new(&[], None)
    }
}

#[async_trait::async_trait]
impl VideoEncoder for ScriptedEncoder {
    async fn start(&mut self, _source: Arc<dyn VideoSource>) -> Result<mpsc::Receiver<EncodedChunk>> {
        let (tx, rx) = mpsc::channel(64);
        for (index, chunk) in self.chunks.iter().enumerate() {
            tx.send(EncodedChunk::new(chunk.clone(), index as u64)).await?;
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            if let Some(chunk) = self.final_chunk.take() {
                tx.send(EncodedChunk::new(chunk, u64::MAX)).await?;
            }
        }
        Ok(())
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Handle for pushing chunks into whichever `FeedEncoder` is currently running
#[derive(Clone, Default)]
pub struct Feed {
    tx: Arc<Mutex<Option<mpsc::Sender<EncodedChunk>>>>,
}

impl Feed {
    pub async fn push(&self, data: &[u8]) {
        let tx = self.tx.lock().unwrap().clone().expect("encoder not started");
        tx.send(EncodedChunk::new(data.to_vec(), 0))
            .await
            .expect("collector gone");
    }

    pub fn encoder(&self) -> FeedEncoder {
        FeedEncoder {
            feed: self.clone(),
            final_chunk: None,
        }
    }

    pub fn encoder_with_final(&self, final_chunk: &[u8]) -> FeedEncoder {
        FeedEncoder {
            feed: self.clone(),
            final_chunk: Some(final_chunk.to_vec()),
        }
    }

    pub fn factory(&self) -> Arc<dyn EncoderFactory> {
        let feed = self.clone();
        Arc::new(move || Box::new(feed.encoder()) as Box<dyn VideoEncoder>)
    }
}

/// Encoder whose chunks are pushed by the test through a `Feed`
pub struct FeedEncoder {
    feed: Feed,
    final_chunk: Option<Vec<u8>>,
}

#[async_trait::async_trait]
impl VideoEncoder for FeedEncoder {
    async fn start(&mut self, _source: Arc<dyn VideoSource>) -> Result<mpsc::Receiver<EncodedChunk>> {
        let (tx, rx) = mpsc::channel(64);
        *self.feed.tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let tx = self.feed.tx.lock().unwrap().take();
        if let (Some(tx), Some(chunk)) = (tx, self.final_chunk.take()) {
            tx.send(EncodedChunk::new(chunk, u64::MAX)).await?;
        }
        Ok(())
    }

    fn mime_type(&self) -> &str {
        "video/webm"
    }

    fn name(&self) -> &str {
        "feed"
    }
}

/// Camera whose `open` calls wait for queued delays, for racing binds
pub struct SlowCamera {
    pub inner: SyntheticCamera,
    delays: Mutex<VecDeque<Duration>>,
}

impl SlowCamera {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            inner: SyntheticCamera::default(),
            delays: Mutex::new(delays.into()),
        }
    }
}

#[async_trait::async_trait]
impl CameraBackend for SlowCamera {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        self.inner.enumerate_devices().await
    }

    async fn open(&self, constraints: &VideoConstraints) -> Result<Arc<dyn VideoSource>> {
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        tokio::time::sleep(delay).await;
        self.inner.open(constraints).await
    }

    fn device_changes(&self) -> Option<watch::Receiver<u64>> {
        self.inner.device_changes()
    }

    fn name(&self) -> &str {
        "slow"
    }
}

pub fn camera_with(devices: Vec<SyntheticDevice>) -> Arc<SyntheticCamera> {
    Arc::new(SyntheticCamera::new(SyntheticConfig {
        devices,
        width: 64,
        height: 36,
    }))
}

pub fn two_cameras() -> Arc<SyntheticCamera> {
    camera_with(vec![
        SyntheticDevice::new("front", "Front", FacingMode::User),
        SyntheticDevice::new("rear", "", FacingMode::Environment),
    ])
}

pub fn session_over(
    camera: Arc<dyn CameraBackend>,
    encoders: Arc<dyn EncoderFactory>,
) -> CaptureSession {
    CaptureSession::new(SessionConfig::default(), camera, encoders)
}

/// Poll until the session buffers `count` chunks
pub async fn wait_for_chunks(session: &CaptureSession, count: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while session.recording().chunk_count().await < count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} chunk(s)",
            count
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
