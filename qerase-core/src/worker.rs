use crate::config::EngineConfig;
use crate::error::{EraseError, Result};
use crate::events::EraseEvent;
use crate::lock::{NoopInspector, ProcessInspector};
use crate::orchestrator::{BatchReport, EraseOrchestrator, EraseRequest};
use crate::process::SystemInspector;
use crate::progress::CancelToken;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver},
    Arc,
};
use std::thread::{self, JoinHandle};

/// Runs at most one erasure batch at a time on a dedicated worker thread.
pub struct Engine {
    config: EngineConfig,
    busy: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, busy: Arc::new(AtomicBool::new(false)) })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn submit(&self, request: EraseRequest) -> Result<BatchHandle> {
        let inspector: Box<dyn ProcessInspector> = if self.config.terminate_holders {
            Box::new(SystemInspector)
        } else {
            Box::new(NoopInspector)
        };
        self.submit_with(request, inspector, Box::new(StdRng::from_entropy()))
    }

    /// `submit` with an explicit process inspector and random source.
    pub fn submit_with(
        &self,
        request: EraseRequest,
        inspector: Box<dyn ProcessInspector>,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<BatchHandle> {
        if self.busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(EraseError::Busy);
        }
        let busy = BusyGuard(self.busy.clone());
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let config = self.config.clone();

        let join = thread::Builder::new()
            .name("qerase-worker".into())
            .spawn(move || {
                let _busy = busy;
                // The localizer is not Send, so the orchestrator is built here.
                let mut orch = EraseOrchestrator::new(config, Box::new(tx))
                    .with_inspector(inspector)
                    .with_rng(rng)
                    .with_cancel_token(token);
                orch.run(&request)
            })
            .map_err(EraseError::Spawn)?;

        Ok(BatchHandle { cancel, events: rx, join })
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Control-side view of a running batch.
pub struct BatchHandle {
    cancel: CancelToken,
    events: Receiver<EraseEvent>,
    join: JoinHandle<BatchReport>,
}

impl BatchHandle {
    /// Request cancellation; the worker stops at its next poll point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Events in emission order. The iterator ends when the worker exits.
    pub fn events(&self) -> &Receiver<EraseEvent> {
        &self.events
    }

    pub fn wait(self) -> Result<BatchReport> {
        self.join.join().map_err(|_| EraseError::WorkerPanicked)
    }
}
