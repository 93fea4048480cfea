//! Archive extraction into a per-class directory.
//!
//! Reads plain or gzip-compressed tar archives. Only regular files and
//! directories are materialized; links and special entries are skipped.
//! Every entry path is confined to the destination before anything is
//! written, and an entry that would escape it fails the whole extraction.

mod guard;
mod resize;

pub use guard::confine;

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tar::EntryType;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Entries declaring more than this are copied verbatim instead of being
/// buffered for resizing.
const MAX_IMAGE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt archive: {0}")]
    Corrupt(#[source] std::io::Error),
    #[error("entry {} escapes the destination directory", .0.display())]
    UnsafePath(PathBuf),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write resized image {}: {source}", path.display())]
    Resize {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Resize decodable images to N x N JPEG; `None` writes entries verbatim.
    pub resize: Option<u32>,
}

/// Counts from one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub files: u64,
    pub resized: u64,
    /// Links, devices and other entries that were not materialized.
    pub skipped_entries: u64,
}

/// Unpacks `archive` into `dest`, creating `dest` if absent.
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    opts: &ExtractOptions,
) -> Result<ExtractReport, ExtractError> {
    fs::create_dir_all(dest).map_err(|source| ExtractError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    let file = File::open(archive).map_err(|source| ExtractError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let gzipped = reader
        .fill_buf()
        .map_err(ExtractError::Corrupt)?
        .starts_with(&GZIP_MAGIC);

    let report = if gzipped {
        unpack(tar::Archive::new(GzDecoder::new(reader)), dest, opts)?
    } else {
        unpack(tar::Archive::new(reader), dest, opts)?
    };
    tracing::debug!(
        archive = %archive.display(),
        files = report.files,
        skipped = report.skipped_entries,
        "archive extracted"
    );
    Ok(report)
}

fn unpack<R: Read>(
    mut archive: tar::Archive<R>,
    dest: &Path,
    opts: &ExtractOptions,
) -> Result<ExtractReport, ExtractError> {
    let mut report = ExtractReport::default();
    for entry in archive.entries().map_err(ExtractError::Corrupt)? {
        let mut entry = entry.map_err(ExtractError::Corrupt)?;
        let raw = entry.path().map_err(ExtractError::Corrupt)?.into_owned();
        let rel = confine(&raw).ok_or_else(|| ExtractError::UnsafePath(raw.clone()))?;
        let target = dest.join(&rel);

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target).map_err(|source| ExtractError::Write {
                    path: target.clone(),
                    source,
                })?;
            }
            kind if kind.is_file() => {
                if rel.as_os_str().is_empty() {
                    return Err(ExtractError::UnsafePath(raw));
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|source| ExtractError::Write {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                if write_file(&mut entry, &target, opts.resize)? {
                    report.resized += 1;
                }
                report.files += 1;
            }
            kind => {
                tracing::debug!(entry = %raw.display(), ?kind, "skipping non-file archive entry");
                report.skipped_entries += 1;
            }
        }
    }
    Ok(report)
}

/// Writes one regular-file entry to `target`. Returns true if it was resized.
fn write_file<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    target: &Path,
    resize: Option<u32>,
) -> Result<bool, ExtractError> {
    let write_err = |source| ExtractError::Write {
        path: target.to_path_buf(),
        source,
    };
    let Some(size) = resize else {
        entry.unpack(target).map_err(write_err)?;
        return Ok(false);
    };

    let declared = entry.size();
    if declared > MAX_IMAGE_BYTES {
        copy_verbatim(entry, target, declared)?;
        return Ok(false);
    }
    // The header size is untrusted; let the buffer grow with what is actually read.
    let mut bytes = Vec::new();
    entry
        .by_ref()
        .take(declared)
        .read_to_end(&mut bytes)
        .map_err(ExtractError::Corrupt)?;
    check_complete(declared, bytes.len() as u64)?;
    match resize::write_resized(&bytes, size, target) {
        Ok(true) => Ok(true),
        Ok(false) => {
            fs::write(target, &bytes).map_err(write_err)?;
            Ok(false)
        }
        Err(source) => Err(ExtractError::Resize {
            path: target.to_path_buf(),
            source,
        }),
    }
}

/// Streams an entry to `target` without holding it in memory.
fn copy_verbatim<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    target: &Path,
    declared: u64,
) -> Result<(), ExtractError> {
    let write_err = |source| ExtractError::Write {
        path: target.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(target).map_err(write_err)?);
    let mut buf = [0u8; 64 * 1024];
    let mut copied = 0u64;
    loop {
        let n = entry.read(&mut buf).map_err(ExtractError::Corrupt)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(write_err)?;
        copied += n as u64;
    }
    out.flush().map_err(write_err)?;
    check_complete(declared, copied)
}

fn check_complete(declared: u64, read: u64) -> Result<(), ExtractError> {
    if read == declared {
        return Ok(());
    }
    Err(ExtractError::Corrupt(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("entry declares {declared} bytes but the archive ends after {read}"),
    )))
}
