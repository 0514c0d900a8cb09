use crate::error::{EraseError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// True iff `path` exists and the current user may both read and write it.
pub fn is_accessible(path: &Path) -> bool {
    if std::fs::symlink_metadata(path).is_err() {
        return false;
    }
    has_read_write(path)
}

/// `is_accessible` as a `Result`.
pub fn check(path: &Path) -> Result<()> {
    if is_accessible(path) {
        Ok(())
    } else {
        Err(EraseError::Validation { path: path.to_path_buf() })
    }
}

#[cfg(unix)]
fn has_read_write(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};
    access(path, AccessFlags::R_OK | AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn has_read_write(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(md) => !md.permissions().readonly(),
        Err(_) => false,
    }
}

/// Every accessible regular file below `dir`, symlinks not followed.
/// Entries the walk cannot read are skipped.
pub fn enumerate_directory(dir: &Path) -> Vec<PathBuf> {
    let mut v = vec![];
    for e in WalkDir::new(dir).min_depth(1).into_iter() {
        let e = match e {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !e.file_type().is_file() {
            continue;
        }
        if is_accessible(e.path()) {
            v.push(e.into_path());
        }
    }
    v
}

/// What a set of paths amounts to before anything is touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sizing {
    /// Regular-file bytes, directories walked recursively.
    pub bytes: u64,
    pub dirs: usize,
    pub links: usize,
}

impl Sizing {
    pub fn is_empty(&self) -> bool {
        self.bytes == 0 && self.dirs == 0 && self.links == 0
    }
}

pub fn measure(paths: &[PathBuf]) -> Sizing {
    let mut s = Sizing::default();
    for p in paths {
        let Ok(md) = std::fs::symlink_metadata(p) else {
            continue;
        };
        if md.is_dir() {
            s.dirs += 1;
            for f in enumerate_directory(p) {
                if let Ok(m) = std::fs::symlink_metadata(&f) {
                    s.bytes += m.len();
                }
            }
        } else if md.file_type().is_symlink() {
            s.links += 1;
        } else if md.file_type().is_file() {
            s.bytes += md.len();
        }
    }
    s
}

/// Split `paths` into admitted and rejected, dropping exact duplicates while
/// keeping the caller's order.
pub fn admit(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut seen = std::collections::HashSet::new();
    let mut ok = vec![];
    let mut rejected = vec![];
    for p in paths {
        if !seen.insert(p.clone()) {
            continue;
        }
        match check(p) {
            Ok(()) => ok.push(p.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "not admitted");
                rejected.push(p.clone());
            }
        }
    }
    (ok, rejected)
}
