pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod orchestrator;

pub use config::{MediaConfig, WorkerAppConfig, WorkerConfig};
pub use error::{GenerationError, Result, WorkerError};
pub use handlers::generation::handle_generation_task;
pub use media::{MediaError, MediaPipeline};
pub use orchestrator::{JobOutcome, Orchestrator};
