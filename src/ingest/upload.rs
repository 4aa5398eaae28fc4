//! Staging uploaded videos on disk.
//!
//! Video decoders want a path, while uploads arrive as byte streams. A
//! `StagedUpload` copies the stream into a named temporary file that is
//! removed when the value is dropped, on every exit path.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

pub struct StagedUpload {
    file: NamedTempFile,
    bytes: u64,
}

impl StagedUpload {
    /// Copy `reader` into a temp file ending in `suffix` (e.g. ".mp4").
    pub fn from_reader<R: Read>(mut reader: R, suffix: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("heritage-upload-")
            .suffix(suffix)
            .tempfile()
            .context("create temp file for upload")?;
        let bytes = std::io::copy(&mut reader, &mut file).context("write upload to temp file")?;
        file.flush().context("flush upload temp file")?;
        log::debug!("staged {} bytes at {}", bytes, file.path().display());
        Ok(Self { file, bytes })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Path as UTF-8, for source configs that take strings.
    pub fn path_string(&self) -> String {
        self.file.path().to_string_lossy().into_owned()
    }

    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_is_removed_on_drop() -> Result<()> {
        let upload = StagedUpload::from_reader(&b"fake video bytes"[..], ".mp4")?;
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(upload.len(), 16);
        assert!(path.to_string_lossy().ends_with(".mp4"));
        assert_eq!(std::fs::read(&path)?, b"fake video bytes");

        drop(upload);
        assert!(!path.exists());
        Ok(())
    }
}
