pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod localize;
pub mod lock;
pub mod orchestrator;
pub mod overwrite;
pub mod process;
pub mod progress;
pub mod reaper;
pub mod standard;
pub mod validate;
pub mod worker;

pub use config::EngineConfig;
pub use error::EraseError;
pub use events::{EraseEvent, EventSink};
pub use orchestrator::{BatchReport, BatchState, EraseOrchestrator, EraseRequest};
pub use progress::CancelToken;
pub use standard::{passes_for, PassSpec, Standard};
pub use worker::{BatchHandle, Engine};
