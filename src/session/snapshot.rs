use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::binder::LiveStream;
use crate::error::{CaptureError, CaptureResult};

/// A still frame captured from the live stream, PNG-encoded
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub device_id: String,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub const MIME_TYPE: &'static str = "image/png";

    /// `data:image/png;base64,...` form for direct display
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            Self::MIME_TYPE,
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

/// Holds at most one snapshot; each capture replaces the last
#[derive(Debug, Default)]
pub struct SnapshotExtractor {
    latest: Option<Snapshot>,
}

impl SnapshotExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample and encode the current frame of `stream`
    pub fn capture(&mut self, stream: Option<&LiveStream>) -> CaptureResult<&Snapshot> {
        let stream = match stream {
            Some(stream) if stream.is_ready() => stream,
            _ => {
                warn!("Snapshot requested without a ready stream");
                return Err(CaptureError::NoActiveStream);
            }
        };

        let frame = stream
            .grab_frame()
            .map_err(|e| CaptureError::Snapshot(e.to_string()))?;
        let png = frame
            .encode_png()
            .map_err(|e| CaptureError::Snapshot(e.to_string()))?;

        info!(
            "Captured {}x{} snapshot from {} ({} bytes)",
            frame.width,
            frame.height,
            stream.device_id(),
            png.len()
        );

        Ok(&*self.latest.insert(Snapshot {
            png,
            width: frame.width,
            height: frame.height,
            device_id: stream.device_id().to_string(),
            captured_at: Utc::now(),
        }))
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn discard(&mut self) {
        self.latest = None;
    }
}
