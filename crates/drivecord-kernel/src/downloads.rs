//! Saving pulled files to the local downloads directory.
//!
//! Layout is `<downloads>/<drive name>/<file name>`. Zipped directory pulls
//! arrive base64-encoded and are written as raw bytes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drivecord_types::PulledObject;
use tracing::debug;

/// Where a pull ended up and what happened on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedDownload {
    pub path: PathBuf,
    /// Final file name, differs from the pulled name when suffixed.
    pub file_name: String,
    /// Directories that had to be created first.
    pub created_dirs: Vec<PathBuf>,
    pub overwritten: bool,
    pub renamed: bool,
}

/// Write `object` under `root/<drive>/`.
///
/// An existing file is replaced when `overwrite` is set. Otherwise the new
/// file gets `_<stamp>` inserted before its extension.
pub fn save_pulled(
    root: &Path,
    drive: &str,
    object: &PulledObject,
    overwrite: bool,
    stamp: u64,
) -> io::Result<SavedDownload> {
    let bytes = if object.is_zip {
        STANDARD
            .decode(object.content.trim())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
    } else {
        object.content.clone().into_bytes()
    };

    let dir = root.join(sanitize(drive));
    let mut created_dirs = Vec::new();
    for candidate in [root, dir.as_path()] {
        if !candidate.exists() {
            fs::create_dir_all(candidate)?;
            created_dirs.push(candidate.to_path_buf());
        }
    }

    let mut file_name = sanitize(&object.name);
    let mut path = dir.join(&file_name);
    let mut overwritten = false;
    let mut renamed = false;
    if path.exists() {
        if overwrite {
            overwritten = true;
        } else {
            file_name = stamped_name(&file_name, stamp);
            path = dir.join(&file_name);
            renamed = true;
        }
    }

    fs::write(&path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved download");

    Ok(SavedDownload {
        path,
        file_name,
        created_dirs,
        overwritten,
        renamed,
    })
}

/// `report.txt` → `report_<stamp>.txt`; a leading dot does not start an extension.
pub fn stamped_name(name: &str, stamp: u64) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{stamp}{}", &name[..dot], &name[dot..]),
        _ => format!("{name}_{stamp}"),
    }
}

/// Keep a server-supplied name inside its directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
