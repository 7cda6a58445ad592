//! Library files on disk

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::archive::HEADER_SIZE;
use crate::config::DecodeLimits;
use crate::events::{read_archive_with, write_archive, EventLibrary};
use crate::{EvtarcError, Result};

/// Read a library archive from a file
///
/// # Errors
///
/// Returns error if the file cannot be opened or mapped, or does not hold a
/// valid archive
pub fn read_library_file(path: &Path, limits: &DecodeLimits) -> Result<EventLibrary> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Err(EvtarcError::Truncated("archive header"));
    }

    // SAFETY: the map is read-only and dropped before this function returns
    let mmap = unsafe { Mmap::map(&file)? };
    if mmap.len() < HEADER_SIZE {
        return Err(EvtarcError::Truncated("archive header"));
    }
    debug!("Mapped {} ({} bytes)", path.display(), mmap.len());

    read_archive_with(&mmap[..], limits.clone())
}

/// Write a library archive to a file, replacing any existing content
///
/// # Errors
///
/// Returns error if the file cannot be created or the library cannot be
/// encoded at its version
pub fn write_library_file(path: &Path, library: &EventLibrary) -> Result<()> {
    let file = File::create(path)?;
    let writer = write_archive(BufWriter::new(file), library)?;
    let file = writer
        .into_inner()
        .map_err(|e| EvtarcError::Io(e.into_error()))?;
    file.sync_all()?;
    debug!("Wrote {}", path.display());
    Ok(())
}
