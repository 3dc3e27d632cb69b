pub mod config;
pub mod cross_subject;
pub mod difficulty;
pub mod error;
pub mod graph;
pub mod mastery;
pub mod path;
pub mod progression;
pub mod stats;
pub mod types;
pub mod unlock;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, GraphIntegrityError};
pub use graph::CurriculumGraph;
pub use progression::{ProgressionEngine, StudentSnapshot};
pub use types::*;
