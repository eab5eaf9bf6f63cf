//! Blueprint archive extraction

use crate::errors::IngestionError;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Extract every entry of `archive` under `dest`, overwriting files from earlier runs.
///
/// Entries whose path would land outside `dest` are skipped. Returns the
/// extracted file paths.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    let file = File::open(archive).map_err(|e| IngestionError::Archive {
        path: archive.display().to_string(),
        message: e.to_string(),
    })?;
    let mut zip = ZipArchive::new(file)?;

    fs::create_dir_all(dest)?;

    let mut extracted = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;

        let relative = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                warn!(entry = entry.name(), "Skipping archive entry outside extraction directory");
                continue;
            }
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        debug!(path = %target.display(), "Extracted");
        extracted.push(target);
    }

    info!(
        archive = %archive.display(),
        dest = %dest.display(),
        files = extracted.len(),
        "Archive extracted"
    );
    Ok(extracted)
}
