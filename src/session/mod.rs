//! Capture session management
//!
//! This module provides the `CaptureSession` controller that manages:
//! - Video input discovery and selection
//! - Binding the live preview stream (facing mode / device)
//! - Still snapshots from the live stream
//! - Recording lifecycle and the ordered chunk buffer
//! - Export of the buffered recording

mod binder;
mod buffer;
mod config;
mod controller;
pub mod devices;
mod export;
mod recording;
mod snapshot;
mod stats;

pub use binder::{LiveStream, StreamBinder};
pub use buffer::ChunkBuffer;
pub use config::SessionConfig;
pub use controller::CaptureSession;
pub use devices::{display_label, list_devices, Device, DeviceOption, DeviceRegistry};
pub use export::{extension_for, VideoBlob};
pub use recording::{RecordingSession, RecordingState, RecordingSummary};
pub use snapshot::{Snapshot, SnapshotExtractor};
pub use stats::SessionStatus;
