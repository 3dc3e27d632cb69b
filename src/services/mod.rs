pub mod progression;

pub use progression::{BatchPathResult, ProgressionService};
