use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::CaptureResult;

/// A finished recording, concatenated and ready to hand out
#[derive(Debug, Clone, Serialize)]
pub struct VideoBlob {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl VideoBlob {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, file_stem: &str) -> Self {
        let mime_type = mime_type.into();
        let file_name = format!("{}.{}", file_stem, extension_for(&mime_type));

        Self {
            data,
            mime_type,
            file_name,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the blob into `dir` under its file name.
    ///
    /// Data goes to a temporary file first and is moved into place once
    /// complete; the temporary file is removed on every failure path.
    pub fn save(&self, dir: impl AsRef<Path>) -> CaptureResult<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let target = dir.join(&self.file_name);

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        debug!("Writing export through {}", temp.path().display());
        temp.write_all(&self.data)?;
        temp.flush()?;
        temp.persist(&target).map_err(|e| e.error)?;

        info!(
            "Saved {} ({} bytes, {})",
            target.display(),
            self.data.len(),
            self.mime_type
        );

        Ok(target)
    }
}

/// File extension for a video content type
pub fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        "video/ogg" => "ogv",
        _ => "bin",
    }
}
