use crate::error::{EraseError, Result};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// Which rung of the ladder removed the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Nothing was there any more.
    AlreadyGone,
    /// Plain empty-directory removal.
    Empty,
    /// Renamed aside, then removed entry by entry.
    Forced,
    /// Platform removal command.
    Command,
}

/// Removes directories whose files have already been destroyed.
pub struct DirectoryReaper<'a> {
    rng: &'a mut dyn RngCore,
    fallback_command: bool,
}

impl<'a> DirectoryReaper<'a> {
    pub fn new(rng: &'a mut dyn RngCore, fallback_command: bool) -> Self {
        Self { rng, fallback_command }
    }

    /// Remove `folder`, escalating:
    /// 1. remove it as an empty directory;
    /// 2. rename it to a random sibling (copy-then-delete if rename fails);
    /// 3. remove the tree entry by entry, ignoring per-entry errors;
    /// 4. run `rm -rf` / `rmdir /s /q` on it.
    pub fn remove(&mut self, folder: &Path) -> Result<Removal> {
        if !exists(folder) {
            tracing::debug!(path = %folder.display(), "folder already gone");
            return Ok(Removal::AlreadyGone);
        }

        match fs::remove_dir(folder) {
            Ok(()) => {
                tracing::info!(path = %folder.display(), "empty folder removed");
                return Ok(Removal::Empty);
            }
            Err(e) => {
                tracing::info!(path = %folder.display(), error = %e, "folder not removable as empty, escalating");
            }
        }

        let target = self.rename_aside(folder).unwrap_or_else(|| folder.to_path_buf());

        force_remove_tree(&target);
        if !exists(&target) {
            tracing::info!(path = %folder.display(), renamed = %target.display(), "folder removed after forced walk");
            return Ok(Removal::Forced);
        }
        tracing::warn!(path = %target.display(), "folder survived forced walk");

        if self.fallback_command {
            if run_removal_command(&target) && !exists(&target) {
                tracing::info!(path = %folder.display(), "folder removed by platform command");
                return Ok(Removal::Command);
            }
            tracing::warn!(path = %target.display(), "platform removal command did not remove folder");
        }

        tracing::error!(path = %folder.display(), "every removal strategy failed");
        Err(EraseError::RemovalExhausted { path: folder.to_path_buf() })
    }

    fn random_name(&mut self) -> String {
        (0..8).map(|_| self.rng.sample(Alphanumeric) as char).collect()
    }

    fn rename_aside(&mut self, folder: &Path) -> Option<PathBuf> {
        let parent = folder.parent()?;
        let mut tmp = parent.join(self.random_name());
        for _ in 0..4 {
            if !exists(&tmp) {
                break;
            }
            tmp = parent.join(self.random_name());
        }
        if exists(&tmp) {
            tracing::warn!(path = %folder.display(), "no free random name for rename");
            return None;
        }

        match fs::rename(folder, &tmp) {
            Ok(()) => {
                tracing::info!(from = %folder.display(), to = %tmp.display(), "folder renamed");
                return Some(tmp);
            }
            Err(e) => {
                tracing::warn!(path = %folder.display(), error = %e, "rename failed, moving by copy");
            }
        }
        match move_by_copy(folder, &tmp) {
            Ok(()) => {
                tracing::info!(from = %folder.display(), to = %tmp.display(), "folder moved by copy");
                Some(tmp)
            }
            Err(e) => {
                tracing::error!(path = %folder.display(), error = %e, "move by copy failed");
                let _ = fs::remove_dir_all(&tmp);
                None
            }
        }
    }
}

fn exists(p: &Path) -> bool {
    fs::symlink_metadata(p).is_ok()
}

fn move_by_copy(src: &Path, dst: &Path) -> io::Result<()> {
    for e in WalkDir::new(src) {
        let e = e?;
        let rel = e.path().strip_prefix(src).map_err(io::Error::other)?;
        let out = dst.join(rel);
        if e.file_type().is_dir() {
            fs::create_dir_all(&out)?;
        } else if e.file_type().is_file() {
            fs::copy(e.path(), &out)?;
        }
    }
    fs::remove_dir_all(src)
}

fn force_remove_tree(root: &Path) {
    for e in WalkDir::new(root).contents_first(true).into_iter().flatten() {
        let p = e.path();
        let r = if e.file_type().is_dir() { fs::remove_dir(p) } else { fs::remove_file(p) };
        if let Err(err) = r {
            tracing::debug!(path = %p.display(), error = %err, "entry not removed");
        }
    }
}

fn run_removal_command(path: &Path) -> bool {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/C", "rmdir", "/s", "/q"]).arg(path);
        c
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = Command::new("rm");
        c.arg("-rf").arg("--").arg(path);
        c
    };
    tracing::info!(command = ?cmd, "running platform removal command");
    match cmd.output() {
        Ok(out) => {
            if !out.status.success() {
                tracing::warn!(
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "removal command failed"
                );
            }
            out.status.success()
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not run removal command");
            false
        }
    }
}
