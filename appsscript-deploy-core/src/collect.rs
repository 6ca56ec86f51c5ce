//! Collects local source files into the project content payload.
//!
//! Walks the source root recursively and keeps the files the remote project understands:
//! `.gs`/`.js` as server code, `.html` as markup, and the root-level `appsscript.json` as the
//! manifest. Everything else is skipped silently. The result is sorted by logical name so
//! uploads are reproducible regardless of directory enumeration order.

use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path};

use feruca::Collator;
use tracing::{debug, info, warn};

use crate::contract::{FileType, ScriptFile};
use crate::error::CollectionError;

pub const MANIFEST_FILE: &str = "appsscript.json";
pub const MANIFEST_NAME: &str = "appsscript";

/// Reads every qualifying file below `root` and returns them ordered by logical name.
///
/// An empty result is valid: uploading it clears the remote project.
pub fn collect_script_files(root: &Path) -> Result<Vec<ScriptFile>, CollectionError> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CollectionError::NotFound(root.to_path_buf()));
        }
        Err(e) => {
            return Err(CollectionError::Io {
                path: root.to_path_buf(),
                source: e,
            })
        }
    };
    if !metadata.is_dir() {
        return Err(CollectionError::NotADirectory(root.to_path_buf()));
    }

    info!(path = %root.display(), "Collecting script files");
    let mut files = Vec::new();
    visit_dir(root, root, &mut files)?;
    let mut collator = Collator::default();
    files.sort_by(|a, b| collate_with(&mut collator, &a.name, &b.name));

    if !files
        .iter()
        .any(|f| f.file_type == FileType::Json && f.name == MANIFEST_NAME)
    {
        warn!("{MANIFEST_FILE} is missing from the payload");
    }
    if files.is_empty() {
        warn!("No script files were discovered. The Apps Script project will be cleared");
    }

    info!(count = files.len(), "Collected script files");
    Ok(files)
}

fn visit_dir(dir: &Path, root: &Path, results: &mut Vec<ScriptFile>) -> Result<(), CollectionError> {
    let io_err = |source: std::io::Error| CollectionError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        // `DirEntry::file_type` does not follow symlinks, so linked directories are never entered.
        let kind = entry.file_type().map_err(|source| CollectionError::Io {
            path: path.clone(),
            source,
        })?;
        if kind.is_dir() {
            visit_dir(&path, root, results)?;
            continue;
        }
        if kind.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_dir()) {
            debug!(path = %path.display(), "Skipping symlinked directory");
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let Some((name, file_type)) = classify(relative) else {
            debug!(path = %relative.display(), "Skipping unsupported file");
            continue;
        };
        let bytes = fs::read(&path).map_err(|source| CollectionError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(name = %name, ?file_type, size = bytes.len(), "Collected file");
        results.push(ScriptFile {
            name,
            file_type,
            source: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }
    Ok(())
}

/// Maps a path relative to the source root to its logical name and file type.
///
/// Returns `None` for files that are not part of the project payload.
pub fn classify(relative: &Path) -> Option<(String, FileType)> {
    let extension = relative.extension()?.to_str()?.to_lowercase();
    let file_type = match extension.as_str() {
        "gs" | "js" => FileType::ServerJs,
        "html" => FileType::Html,
        "json" if relative == Path::new(MANIFEST_FILE) => {
            return Some((MANIFEST_NAME.to_string(), FileType::Json));
        }
        _ => return None,
    };
    Some((logical_name(&relative.with_extension("")), file_type))
}

fn logical_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Locale-aware ordering of logical names: Unicode collation with the CLDR root
/// tailoring, falling back to code point order so the result is total.
pub fn collate(a: &str, b: &str) -> Ordering {
    collate_with(&mut Collator::default(), a, b)
}

fn collate_with(collator: &mut Collator, a: &str, b: &str) -> Ordering {
    collator.collate(a, b).then_with(|| a.cmp(b))
}
