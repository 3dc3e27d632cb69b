use thiserror::Error;

use crate::engine::types::ChapterId;

/// Authoring errors found while loading a curriculum. A graph that fails any
/// of these checks is never evaluated for a student.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphIntegrityError {
    #[error("duplicate chapter id {0}")]
    DuplicateChapter(ChapterId),
    #[error("chapter {from} references unknown prerequisite {to}")]
    DanglingReference { from: ChapterId, to: ChapterId },
    #[error("prerequisite cycle through chapters {}", .0.join(", "))]
    Cycle(Vec<ChapterId>),
    #[error("chapter {from} declares an authored reinforcement edge to {to}")]
    AuthoredReinforcement { from: ChapterId, to: ChapterId },
    #[error("chapter {chapter} has difficulty tier {tier}, expected 1..=5")]
    InvalidTier { chapter: ChapterId, tier: u8 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("unknown student {0}")]
    UnknownStudent(String),
    #[error("unknown curriculum {0}")]
    UnknownCurriculum(String),
    #[error("unknown chapter {0}")]
    UnknownChapter(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    GraphIntegrity(#[from] GraphIntegrityError),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownStudent(_) | Self::UnknownCurriculum(_) | Self::UnknownChapter(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
