use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::binder::LiveStream;
use super::buffer::ChunkBuffer;
use super::export::VideoBlob;
use crate::error::{CaptureError, CaptureResult};
use crate::media::{EncodedChunk, VideoEncoder};

/// How long `stop` waits for the encoder to drain before giving up
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Recording lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

/// Result of a completed recording period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Non-empty chunks received during this period
    pub chunks_received: usize,
    /// Chunks held in the buffer after stopping
    pub buffered_chunks: usize,
}

struct ActiveRecording {
    encoder: Box<dyn VideoEncoder>,
    collector: JoinHandle<usize>,
    stream_id: uuid::Uuid,
    started_at: DateTime<Utc>,
}

struct BufferedVideo {
    chunks: ChunkBuffer,
    mime_type: String,
}

/// Idle/Recording state machine accumulating encoded chunks
///
/// Chunks flow from the encoder through a channel into a single collector
/// task, so the buffer order is the channel order. Start and stop are
/// serialized against each other.
pub struct RecordingSession {
    reset_on_start: bool,
    is_recording: AtomicBool,
    active: Mutex<Option<ActiveRecording>>,
    buffer: Arc<Mutex<BufferedVideo>>,
}

impl RecordingSession {
    pub fn new(reset_on_start: bool) -> Self {
        Self {
            reset_on_start,
            is_recording: AtomicBool::new(false),
            active: Mutex::new(None),
            buffer: Arc::new(Mutex::new(BufferedVideo {
                chunks: ChunkBuffer::new(),
                mime_type: "video/webm".to_string(),
            })),
        }
    }

    pub fn state(&self) -> RecordingState {
        if self.is_recording.load(Ordering::SeqCst) {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    /// Idle → Recording
    pub async fn start(
        &self,
        stream: Option<&LiveStream>,
        mut encoder: Box<dyn VideoEncoder>,
    ) -> CaptureResult<()> {
        let mut active = self.active.lock().await;

        if active.is_some() {
            warn!("Start requested while already recording");
            return Err(CaptureError::AlreadyRecording);
        }

        let stream = match stream {
            Some(stream) if stream.is_ready() => stream,
            _ => {
                warn!("Start requested without a ready stream");
                return Err(CaptureError::NoActiveStream);
            }
        };

        // Accumulated chunks can only be joined with chunks of the same type
        if !self.reset_on_start {
            let buffered = self.buffer.lock().await;
            if !buffered.chunks.is_empty() && buffered.mime_type != encoder.mime_type() {
                warn!(
                    "Encoder {} produces {} but the buffer holds {}",
                    encoder.name(),
                    encoder.mime_type(),
                    buffered.mime_type
                );
                return Err(CaptureError::Encoder(format!(
                    "content type {} does not match buffered {}",
                    encoder.mime_type(),
                    buffered.mime_type
                )));
            }
        }

        info!(
            "Starting recording on stream {} with {}",
            stream.id(),
            encoder.name()
        );

        let chunk_rx = encoder
            .start(stream.source())
            .await
            .map_err(|e| CaptureError::Encoder(e.to_string()))?;

        {
            let mut buffered = self.buffer.lock().await;
            if self.reset_on_start && !buffered.chunks.is_empty() {
                debug!(
                    "Discarding {} chunk(s) from the previous recording",
                    buffered.chunks.len()
                );
                buffered.chunks.clear();
            }
            buffered.mime_type = encoder.mime_type().to_string();
        }

        let collector = tokio::spawn(collect_chunks(chunk_rx, Arc::clone(&self.buffer)));

        *active = Some(ActiveRecording {
            encoder,
            collector,
            stream_id: stream.id(),
            started_at: Utc::now(),
        });
        self.is_recording.store(true, Ordering::SeqCst);

        info!("Recording started");

        Ok(())
    }

    /// Recording → Idle, after every chunk flushed by the encoder is buffered
    pub async fn stop(&self) -> CaptureResult<RecordingSummary> {
        let mut active = self.active.lock().await;

        let Some(mut recording) = active.take() else {
            warn!("Stop requested while idle");
            return Err(CaptureError::NotRecording);
        };

        info!("Stopping recording on stream {}", recording.stream_id);

        // Finalize first: the encoder flushes into the channel, then closes it
        if let Err(e) = recording.encoder.stop().await {
            error!("Encoder {} failed to finalize: {}", recording.encoder.name(), e);
        }

        let abort = recording.collector.abort_handle();
        let chunks_received = match tokio::time::timeout(DRAIN_TIMEOUT, recording.collector).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                error!("Chunk collector panicked: {}", e);
                0
            }
            Err(_) => {
                error!("Encoder did not close its channel within {:?}", DRAIN_TIMEOUT);
                abort.abort();
                0
            }
        };

        self.is_recording.store(false, Ordering::SeqCst);

        let buffered_chunks = self.buffer.lock().await.chunks.len();
        let duration = Utc::now().signed_duration_since(recording.started_at);

        info!(
            "Recording stopped: {} chunk(s) received, {} buffered",
            chunks_received, buffered_chunks
        );

        Ok(RecordingSummary {
            started_at: recording.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_received,
            buffered_chunks,
        })
    }

    /// Empty the buffer. Recording, if active, continues into the empty buffer.
    pub async fn clear(&self) {
        let mut buffered = self.buffer.lock().await;
        let dropped = buffered.chunks.len();
        buffered.chunks.clear();
        info!("Cleared {} buffered chunk(s)", dropped);
    }

    /// Concatenate the buffer into one blob; `None` if there is nothing to export.
    /// The buffer is left untouched.
    pub async fn export(&self, file_stem: &str) -> Option<VideoBlob> {
        let buffered = self.buffer.lock().await;

        if buffered.chunks.is_empty() {
            debug!("Export requested with an empty buffer");
            return None;
        }

        let blob = VideoBlob::new(buffered.chunks.concat(), buffered.mime_type.clone(), file_stem);

        info!(
            "Exported {} chunk(s) as {} ({} bytes)",
            buffered.chunks.len(),
            blob.file_name,
            blob.len()
        );

        Some(blob)
    }

    /// Copy of the buffered chunks, in order
    pub async fn chunks(&self) -> Vec<EncodedChunk> {
        self.buffer.lock().await.chunks.chunks().to_vec()
    }

    pub async fn chunk_count(&self) -> usize {
        self.buffer.lock().await.chunks.len()
    }

    pub async fn buffered_bytes(&self) -> usize {
        self.buffer.lock().await.chunks.total_bytes()
    }

    pub async fn mime_type(&self) -> String {
        self.buffer.lock().await.mime_type.clone()
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(recording) = self.active.get_mut().take() {
            warn!("Recording session dropped while recording; aborting collector");
            recording.collector.abort();
        }
    }
}

async fn collect_chunks(
    mut chunk_rx: mpsc::Receiver<EncodedChunk>,
    buffer: Arc<Mutex<BufferedVideo>>,
) -> usize {
    let mut received = 0;

    while let Some(chunk) = chunk_rx.recv().await {
        let size = chunk.len();
        let mut buffered = buffer.lock().await;
        if buffered.chunks.push(chunk) {
            received += 1;
            debug!("Buffered chunk #{} ({} bytes)", buffered.chunks.len(), size);
        } else {
            debug!("Dropped empty chunk");
        }
    }

    received
}
