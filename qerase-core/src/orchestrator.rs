use crate::config::EngineConfig;
use crate::display::short_path;
use crate::error::EraseError;
use crate::events::{EraseEvent, EventSink};
use crate::localize::FluentLoc;
use crate::lock::{LockOutcome, LockResolver, NoopInspector, ProcessInspector};
use crate::overwrite::{DestroyOutcome, OverwriteExecutor};
use crate::process::SystemInspector;
use crate::progress::{BatchProgress, CancelToken};
use crate::reaper::{DirectoryReaper, Removal};
use crate::standard::{PassSpec, Standard};
use crate::validate;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Paths and standard for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraseRequest {
    paths: Vec<PathBuf>,
    standard: Standard,
}

impl EraseRequest {
    /// Exact duplicates are dropped; the first occurrence keeps its place.
    pub fn new<I, P>(paths: I, standard: Standard) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut seen = HashSet::new();
        let paths = paths
            .into_iter()
            .map(Into::into)
            .filter(|p: &PathBuf| seen.insert(p.clone()))
            .collect();
        Self { paths, standard }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn standard(&self) -> Standard {
        self.standard
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    #[default]
    Idle,
    Sizing,
    DestroyingFiles,
    RemovingFolders,
    Finished,
    Cancelled,
    Failed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Finished | BatchState::Cancelled | BatchState::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub state: BatchState,
    pub files_destroyed: usize,
    pub files_failed: usize,
    pub paths_skipped: usize,
    pub folders_removed: usize,
    /// Folders that needed more than a plain empty-directory removal.
    pub folders_escalated: usize,
    pub folders_failed: usize,
    pub bytes_written: u64,
}

impl BatchReport {
    pub fn had_item_errors(&self) -> bool {
        self.files_failed > 0 || self.folders_failed > 0
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Cancelled,
}

/// Runs one batch end to end: sizing, file destruction, folder removal.
pub struct EraseOrchestrator {
    config: EngineConfig,
    loc: FluentLoc,
    locks: LockResolver,
    rng: Box<dyn RngCore + Send>,
    cancel: CancelToken,
    sink: Box<dyn EventSink>,
    state: BatchState,
}

impl EraseOrchestrator {
    pub fn new(config: EngineConfig, sink: Box<dyn EventSink>) -> Self {
        let inspector: Box<dyn ProcessInspector> = if config.terminate_holders {
            Box::new(SystemInspector)
        } else {
            Box::new(NoopInspector)
        };
        Self {
            loc: FluentLoc::builtin(&config.language),
            locks: LockResolver::new(inspector, config.terminate_timeout()),
            rng: Box::new(StdRng::from_entropy()),
            cancel: CancelToken::new(),
            sink,
            state: BatchState::Idle,
            config,
        }
    }

    pub fn with_inspector(mut self, inspector: Box<dyn ProcessInspector>) -> Self {
        self.locks = LockResolver::new(inspector, self.config.terminate_timeout());
        self
    }

    /// Replace the random source used for random passes and temporary names.
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn run(&mut self, request: &EraseRequest) -> BatchReport {
        let mut report = BatchReport::default();
        let passes = request.standard().passes();
        tracing::info!(
            paths = request.paths().len(),
            standard = request.standard().id(),
            passes = passes.len(),
            "starting erasure batch"
        );

        self.enter(BatchState::Sizing);
        self.status("status-sizing", None);
        let (admitted, rejected) = validate::admit(request.paths());
        for p in &rejected {
            self.status("status-skipped", Some(p.as_path()));
            report.paths_skipped += 1;
        }
        let sizing = validate::measure(&admitted);
        if admitted.is_empty() || sizing.is_empty() {
            return self.fail(report);
        }
        let total = sizing.bytes.saturating_mul(passes.len() as u64);
        tracing::info!(bytes = sizing.bytes, work = total, dirs = sizing.dirs, "batch sized");
        let mut progress = BatchProgress::new(total, self.config.progress_interval());

        self.enter(BatchState::DestroyingFiles);
        let mut folders: HashSet<PathBuf> = HashSet::new();
        for path in &admitted {
            if self.cancel.is_cancelled() {
                return self.cancelled(report);
            }
            let md = match fs::symlink_metadata(path) {
                Ok(md) if validate::is_accessible(path) => md,
                _ => {
                    tracing::warn!(path = %path.display(), "path vanished or became inaccessible, skipping");
                    self.status("status-skipped", Some(path.as_path()));
                    report.paths_skipped += 1;
                    continue;
                }
            };
            let flow = if md.is_dir() {
                folders.insert(path.clone());
                self.destroy_tree(path, &passes, &mut progress, &mut folders, &mut report)
            } else if md.file_type().is_symlink() {
                self.unlink(path, &mut report);
                Flow::Continue
            } else if md.file_type().is_file() {
                self.destroy_file(path, &passes, &mut progress, &mut report)
            } else {
                tracing::warn!(path = %path.display(), "not a regular file, skipping");
                self.status("status-skipped", Some(path.as_path()));
                report.paths_skipped += 1;
                Flow::Continue
            };
            if flow == Flow::Cancelled {
                return self.cancelled(report);
            }
        }

        self.enter(BatchState::RemovingFolders);
        let mut ordered: Vec<PathBuf> = folders.into_iter().collect();
        // Deepest first so parents are normally empty by the time they come up.
        ordered.sort_by(|a, b| {
            b.components().count().cmp(&a.components().count()).then_with(|| a.cmp(b))
        });
        tracing::info!(count = ordered.len(), "removing folders");
        for folder in ordered {
            if self.cancel.is_cancelled() {
                return self.cancelled(report);
            }
            self.remove_folder(&folder, &mut report);
        }

        if self.cancel.is_cancelled() {
            return self.cancelled(report);
        }
        if let Some(pct) = progress.complete() {
            self.sink.emit(EraseEvent::Progress(pct));
        }
        self.status("status-done", None);
        self.sink.emit(EraseEvent::Finished);
        self.enter(BatchState::Finished);
        report.state = BatchState::Finished;
        tracing::info!(?report, "erasure batch finished");
        report
    }

    /// Destroy every file below `dir` bottom-up and record each subdirectory.
    fn destroy_tree(
        &mut self,
        dir: &Path,
        passes: &[PassSpec],
        progress: &mut BatchProgress,
        folders: &mut HashSet<PathBuf>,
        report: &mut BatchReport,
    ) -> Flow {
        tracing::info!(path = %dir.display(), "walking folder");
        for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(dir = %dir.display(), error = %err, "unreadable entry left for folder removal");
                    continue;
                }
            };
            let p = entry.path();
            let ft = entry.file_type();
            if ft.is_dir() {
                if folders.insert(p.to_path_buf()) {
                    tracing::debug!(path = %p.display(), "folder queued for removal");
                }
                continue;
            }
            if ft.is_symlink() {
                self.unlink(p, report);
                continue;
            }
            if !ft.is_file() {
                tracing::debug!(path = %p.display(), "special entry left for folder removal");
                continue;
            }
            if !validate::is_accessible(p) {
                tracing::warn!(path = %p.display(), "file inaccessible, skipping");
                report.paths_skipped += 1;
                continue;
            }
            if self.destroy_file(p, passes, progress, report) == Flow::Cancelled {
                return Flow::Cancelled;
            }
        }
        Flow::Continue
    }

    fn destroy_file(
        &mut self,
        path: &Path,
        passes: &[PassSpec],
        progress: &mut BatchProgress,
        report: &mut BatchReport,
    ) -> Flow {
        if self.cancel.is_cancelled() {
            return Flow::Cancelled;
        }
        tracing::info!(path = %path.display(), "erasing file");
        self.status("status-erasing", Some(path));

        if self.locks.is_locked(path) {
            tracing::warn!(error = %EraseError::Locked { path: path.to_path_buf() }, "resolving lock");
            self.status("status-locked", Some(path));
            let outcome = self.locks.release(path);
            tracing::info!(path = %path.display(), ?outcome, "lock resolution finished");
            if let LockOutcome::Survivors(held) = &outcome {
                let shown = short_path(path);
                for h in held {
                    let holder = format!("{} ({})", h.name, h.pid);
                    let msg = self
                        .loc
                        .msg("error-locked", &[("path", shown.as_str()), ("holder", holder.as_str())]);
                    self.sink.emit(EraseEvent::Status(msg));
                }
            }
        }

        let sink = &self.sink;
        let mut exec = OverwriteExecutor::new(
            self.config.chunk_size,
            self.config.sync_each_pass,
            &self.cancel,
            &mut *self.rng,
        );
        let result =
            exec.destroy(path, passes, progress, &mut |pct| sink.emit(EraseEvent::Progress(pct)));
        match result {
            Ok(DestroyOutcome::Destroyed { bytes_written }) => {
                report.files_destroyed += 1;
                report.bytes_written += bytes_written;
                Flow::Continue
            }
            Ok(DestroyOutcome::Cancelled { bytes_written }) => {
                report.bytes_written += bytes_written;
                tracing::info!(path = %path.display(), "cancelled mid-file");
                Flow::Cancelled
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "file not destroyed");
                report.files_failed += 1;
                let code = match e {
                    EraseError::Delete { .. } => "error-delete",
                    _ => "error-process",
                };
                self.error(code, path);
                Flow::Continue
            }
        }
    }

    fn unlink(&mut self, link: &Path, report: &mut BatchReport) {
        match fs::remove_file(link) {
            Ok(()) => tracing::info!(path = %link.display(), "symlink removed without following"),
            Err(e) => {
                tracing::error!(path = %link.display(), error = %e, "symlink not removed");
                report.files_failed += 1;
                self.error("error-delete", link);
            }
        }
    }

    fn remove_folder(&mut self, folder: &Path, report: &mut BatchReport) {
        self.status("status-folder", Some(folder));
        let mut reaper = DirectoryReaper::new(&mut *self.rng, self.config.fallback_command);
        match reaper.remove(folder) {
            Ok(how) => {
                tracing::debug!(path = %folder.display(), ?how, "folder completed");
                report.folders_removed += 1;
                if matches!(how, Removal::Forced | Removal::Command) {
                    report.folders_escalated += 1;
                }
                self.sink.emit(EraseEvent::FolderCompleted(folder.to_path_buf()));
            }
            Err(e) => {
                tracing::error!(path = %folder.display(), error = %e, "folder not removed");
                report.folders_failed += 1;
                self.error("error-folder", folder);
            }
        }
    }

    fn enter(&mut self, next: BatchState) {
        tracing::debug!(from = ?self.state, to = ?next, "batch state");
        self.state = next;
    }

    fn status(&self, code: &str, path: Option<&Path>) {
        let msg = match path {
            Some(p) => {
                let shown = short_path(p);
                self.loc.msg(code, &[("path", shown.as_str())])
            }
            None => self.loc.msg(code, &[]),
        };
        self.sink.emit(EraseEvent::Status(msg));
    }

    fn error(&self, code: &str, path: &Path) {
        let shown = short_path(path);
        let msg = self.loc.msg(code, &[("path", shown.as_str())]);
        self.sink.emit(EraseEvent::Error(msg));
    }

    fn fail(&mut self, mut report: BatchReport) -> BatchReport {
        tracing::error!(error = %EraseError::NothingToErase, "batch aborted before any write");
        self.sink.emit(EraseEvent::Error(self.loc.msg("error-nothing", &[])));
        self.enter(BatchState::Failed);
        report.state = BatchState::Failed;
        report
    }

    fn cancelled(&mut self, mut report: BatchReport) -> BatchReport {
        tracing::info!(?report, "erasure batch cancelled");
        self.status("status-cancelled", None);
        self.sink.emit(EraseEvent::Cancelled);
        self.enter(BatchState::Cancelled);
        report.state = BatchState::Cancelled;
        report
    }
}
