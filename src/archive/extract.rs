//! Streaming zip extraction.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use tokio_util::io::SyncIoBridge;
use zip::result::ZipError;

use super::path::sanitize_entry_path;
use crate::client::{ArchiveStream, take_transfer_error};
use crate::plugins::PluginError;

/// Entry label used when a failure happens between entries.
const ARCHIVE_LABEL: &str = "<archive>";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Decodes a zip archive entry by entry straight from its stream.
///
/// Only local file headers are used, so the archive never has to be
/// seekable or held in memory. A failure leaves whatever was already
/// written in place.
pub struct Extractor;

impl Extractor {
    pub async fn extract(
        stream: ArchiveStream,
        target: &Path,
    ) -> Result<ExtractSummary, PluginError> {
        tracing::debug!(
            target_dir = %target.display(),
            content_length = ?stream.content_length(),
            "Extracting archive"
        );
        let target = target.to_path_buf();
        let reader = SyncIoBridge::new(stream);

        tokio::task::spawn_blocking(move || Self::extract_from(reader, &target))
            .await
            .map_err(|e| PluginError::extract(ARCHIVE_LABEL, e))?
    }

    pub(crate) fn extract_from<R: Read>(
        mut reader: R,
        target: &Path,
    ) -> Result<ExtractSummary, PluginError> {
        let mut summary = ExtractSummary::default();

        loop {
            let mut entry = match zip::read::read_zipfile_from_stream(&mut reader) {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(zip_failure(ARCHIVE_LABEL, e)),
            };

            let name = entry.name().to_string();
            let relative =
                sanitize_entry_path(&name).map_err(|cause| PluginError::extract(&name, cause))?;
            let out = target.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&out).map_err(|e| PluginError::extract(&name, e))?;
                summary.directories += 1;
                continue;
            }

            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(|e| PluginError::extract(&name, e))?;
            }
            let mut file = File::create(&out).map_err(|e| PluginError::extract(&name, e))?;
            let written = io::copy(&mut entry, &mut file).map_err(|e| read_failure(&name, e))?;

            summary.files += 1;
            summary.bytes += written;
        }

        tracing::trace!(
            target_dir = %target.display(),
            files = summary.files,
            directories = summary.directories,
            "Archive extracted"
        );
        Ok(summary)
    }
}

fn read_failure(entry: &str, err: io::Error) -> PluginError {
    match take_transfer_error(err) {
        Ok(network) => network,
        Err(err) => PluginError::extract(entry, err),
    }
}

fn zip_failure(entry: &str, err: ZipError) -> PluginError {
    match err {
        ZipError::Io(io) => read_failure(entry, io),
        other => PluginError::extract(entry, other),
    }
}
