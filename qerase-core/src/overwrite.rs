use crate::error::{EraseError, Result};
use crate::progress::{BatchProgress, CancelToken};
use crate::standard::PassSpec;
use rand::RngCore;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Every pass written and the file unlinked.
    Destroyed { bytes_written: u64 },
    /// Stopped at a poll point; the file is left as far as it got.
    Cancelled { bytes_written: u64 },
}

impl DestroyOutcome {
    pub fn bytes_written(&self) -> u64 {
        match *self {
            DestroyOutcome::Destroyed { bytes_written } => bytes_written,
            DestroyOutcome::Cancelled { bytes_written } => bytes_written,
        }
    }
}

/// Streams pass patterns over a file in fixed-size chunks.
pub struct OverwriteExecutor<'a> {
    chunk_size: usize,
    sync_each_pass: bool,
    cancel: &'a CancelToken,
    rng: &'a mut dyn RngCore,
}

impl<'a> OverwriteExecutor<'a> {
    pub fn new(
        chunk_size: usize,
        sync_each_pass: bool,
        cancel: &'a CancelToken,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self { chunk_size: chunk_size.max(1), sync_each_pass, cancel, rng }
    }

    /// Overwrite `path` with every pass, then delete it.
    ///
    /// Cancellation is polled before the file is opened, before each pass and
    /// before each chunk. `report` receives throttled batch percentages.
    pub fn destroy(
        &mut self,
        path: &Path,
        passes: &[PassSpec],
        progress: &mut BatchProgress,
        report: &mut dyn FnMut(u8),
    ) -> Result<DestroyOutcome> {
        let outcome = self.overwrite(path, passes, progress, report)?;
        if let DestroyOutcome::Cancelled { .. } = outcome {
            return Ok(outcome);
        }
        fs::remove_file(path)
            .map_err(|source| EraseError::Delete { path: path.to_path_buf(), source })?;
        tracing::info!(path = %path.display(), bytes = outcome.bytes_written(), "file destroyed");
        Ok(outcome)
    }

    /// The overwrite half of `destroy`: the file is left in place.
    pub fn overwrite(
        &mut self,
        path: &Path,
        passes: &[PassSpec],
        progress: &mut BatchProgress,
        report: &mut dyn FnMut(u8),
    ) -> Result<DestroyOutcome> {
        let io_err = |source| EraseError::Overwrite { path: path.to_path_buf(), source };
        if self.cancel.is_cancelled() {
            return Ok(DestroyOutcome::Cancelled { bytes_written: 0 });
        }
        let size = fs::metadata(path).map_err(io_err)?.len();
        let buf_len = std::cmp::min(size, self.chunk_size as u64).max(1) as usize;
        let mut buf = vec![0u8; buf_len];
        let mut bytes_written = 0u64;

        for (i, pass) in passes.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(DestroyOutcome::Cancelled { bytes_written });
            }
            let mut f = open_for_pass(path, i).map_err(io_err)?;
            let mut written = 0u64;
            while written < size {
                if self.cancel.is_cancelled() {
                    return Ok(DestroyOutcome::Cancelled { bytes_written });
                }
                let n = std::cmp::min(size - written, buf_len as u64) as usize;
                pass.fill(&mut buf[..n], &mut *self.rng);
                f.write_all(&buf[..n]).map_err(io_err)?;
                written += n as u64;
                bytes_written += n as u64;
                if let Some(pct) = progress.advance(n as u64, Instant::now()) {
                    report(pct);
                }
            }
            f.flush().map_err(io_err)?;
            if self.sync_each_pass {
                f.sync_all().map_err(io_err)?;
            }
            if let Some(pct) = progress.flush() {
                report(pct);
            }
            tracing::debug!(path = %path.display(), pass = i + 1, of = passes.len(), ?pass, "pass complete");
        }
        Ok(DestroyOutcome::Destroyed { bytes_written })
    }
}

// The first pass truncates; later passes rewrite in place so the size holds.
fn open_for_pass(path: &Path, pass: usize) -> std::io::Result<File> {
    if pass == 0 {
        OpenOptions::new().write(true).truncate(true).open(path)
    } else {
        OpenOptions::new().read(true).write(true).open(path)
    }
}
