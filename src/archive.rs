use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::error::BenchError;

/// Decodes an archive into a directory.
///
/// The cache only ever hands implementations a private staging directory, so
/// they are free to write members in any order.
pub trait Unpack: Send + Sync {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Unpacks jar/zip archives with the `zip` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipUnpacker;

impl Unpack for ZipUnpacker {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file =
            File::open(archive).with_context(|| format!("Failed to open archive: {archive:?}"))?;
        let mut zip = ZipArchive::new(file)
            .with_context(|| format!("Failed to read zip directory of {archive:?}"))?;

        let pb = ProgressBar::new(zip.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:60.magenta/black}] {pos}/{len} {msg}")?
                .progress_chars("⟨⟨⟨⟨⟨····· "),
        );
        pb.set_message(crate::path_utils::file_name_str(archive));

        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .with_context(|| format!("Failed to read entry {index} of {archive:?}"))?;
            let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
                warn!("Skipping entry with unsafe path: {}", entry.name());
                continue;
            };
            let out_path = dest.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&out_path)
                    .with_context(|| format!("Failed to create directory: {out_path:?}"))?;
            } else {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create directory: {parent:?}"))?;
                }
                let mut out = File::create(&out_path)
                    .with_context(|| format!("Failed to create file: {out_path:?}"))?;
                io::copy(&mut entry, &mut out)
                    .with_context(|| format!("Failed to write {out_path:?}"))?;
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
                }
            }

            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(())
    }
}

/// Directory an archive extracts to, next to the archive itself
pub fn extracted_path(archive: &Path, extracted_name: &str) -> Result<PathBuf> {
    let parent = archive
        .parent()
        .with_context(|| format!("Archive has no parent directory: {archive:?}"))?;
    Ok(parent.join(extracted_name))
}

/// Durable extraction cache keyed by archive location.
///
/// An archive `dir/foo.jar` extracted under the name `foo.extracted` always
/// lands in `dir/foo.extracted`. The presence of that directory is the only
/// completion signal: it is never validated against the archive, so replacing
/// an archive in place keeps serving the old contents until the directory is
/// removed by hand.
pub struct ArchiveCache<U: Unpack = ZipUnpacker> {
    unpacker: U,
}

impl Default for ArchiveCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self {
            unpacker: ZipUnpacker,
        }
    }
}

impl<U: Unpack> ArchiveCache<U> {
    /// Create a cache with a custom decoder
    pub fn with_unpacker(unpacker: U) -> Self {
        Self { unpacker }
    }

    /// Extract `archive` once and return the extraction root.
    ///
    /// Members are written to a hidden staging directory beside the target and
    /// published with a single rename, so no caller (in this process or any
    /// other sharing the file system) ever sees a partially populated root.
    /// Racing callers may each decode into their own staging area; the first
    /// rename wins and the losers discard their copy.
    pub fn extract(&self, archive: &Path, extracted_name: &str) -> Result<PathBuf> {
        let target = extracted_path(archive, extracted_name)?;
        if target.exists() {
            debug!("Using cached extraction {target:?}");
            return Ok(target);
        }

        let parent = target
            .parent()
            .with_context(|| format!("Extraction target has no parent: {target:?}"))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{extracted_name}."))
            .tempdir_in(parent)
            .map_err(|e| BenchError::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("cannot create staging directory in {parent:?}: {e}"),
            })?;

        info!("Extracting {archive:?} to {target:?}");
        if let Err(e) = self.unpacker.unpack(archive, staging.path()) {
            return Err(BenchError::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("{e:#}"),
            }
            .into());
        }

        // After a successful rename the staging path is gone and dropping
        // the guard removes nothing.
        match fs::rename(staging.path(), &target) {
            Ok(()) => debug!("Published extraction {target:?}"),
            Err(e) if target.exists() => {
                debug!("Extraction {target:?} was published concurrently ({e}), discarding ours");
            }
            Err(e) => {
                return Err(BenchError::Extraction {
                    archive: archive.to_path_buf(),
                    reason: format!("cannot publish {target:?}: {e}"),
                }
                .into());
            }
        }

        Ok(target)
    }
}
