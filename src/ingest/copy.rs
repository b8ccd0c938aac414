// File copy operations for ingest

use std::fs;
use std::path::{Path, PathBuf};
use filetime::FileTime;

use crate::constants::NAME_SUFFIX_LEN;
use crate::error::{ShelfError, Result};

const MAX_NAME_ATTEMPTS: usize = 16;

/// Short random hex tag used to keep stored names unique
pub fn random_suffix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..NAME_SUFFIX_LEN].to_string()
}

/// `<stem>_<8 hex>.<ext lowercased>` for a source file name
pub fn unique_file_name(source: &Path) -> Result<String> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| ShelfError::InvalidPath(format!("No file name: {}", source.display())))?;

    let name = match source.extension() {
        Some(ext) => format!("{}_{}.{}", stem, random_suffix(), ext.to_string_lossy().to_lowercase()),
        None => format!("{}_{}", stem, random_suffix()),
    };
    Ok(name)
}

/// Copy `source` into `dest_dir` under a fresh unique name.
/// The source is never modified. Returns the full destination path.
pub fn copy_into_storage(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).map_err(|e| ShelfError::CopyFailed {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    for _ in 0..MAX_NAME_ATTEMPTS {
        let dest = dest_dir.join(unique_file_name(source)?);
        if dest.exists() {
            continue;
        }
        copy_with_verify(source, &dest)?;
        return Ok(dest);
    }

    Err(ShelfError::Other(format!(
        "Could not find a free storage name for {}",
        source.display()
    )))
}

/// Copy file, check the size matches, keep the source timestamps
fn copy_with_verify(source: &Path, dest: &Path) -> Result<()> {
    let copy_failed = |e: std::io::Error| ShelfError::CopyFailed {
        path: source.to_path_buf(),
        source: e,
    };

    let source_meta = fs::metadata(source).map_err(copy_failed)?;
    if let Err(e) = fs::copy(source, dest) {
        let _ = fs::remove_file(dest);
        return Err(copy_failed(e));
    }

    let dest_size = fs::metadata(dest).map_err(copy_failed)?.len();
    if dest_size != source_meta.len() {
        let _ = fs::remove_file(dest);
        return Err(copy_failed(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("size mismatch ({} vs {})", source_meta.len(), dest_size),
        )));
    }

    let mtime = FileTime::from_last_modification_time(&source_meta);
    let atime = FileTime::from_last_access_time(&source_meta);
    if let Err(e) = filetime::set_file_times(dest, atime, mtime) {
        log::warn!("Could not preserve timestamps on {}: {}", dest.display(), e);
    }

    Ok(())
}
