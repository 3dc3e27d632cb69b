use std::collections::{BTreeMap, BTreeSet};

use crate::engine::error::GraphIntegrityError;
use crate::engine::types::{Chapter, ChapterId, EdgeType, Prerequisite};

const MIN_TIER: u8 = 1;
const MAX_TIER: u8 = 5;

/// Immutable chapter DAG. Construction validates the whole graph; an instance
/// that exists is always acyclic and free of dangling references.
#[derive(Debug, Clone)]
pub struct CurriculumGraph {
    chapters: BTreeMap<ChapterId, Chapter>,
    successors: BTreeMap<ChapterId, Vec<(ChapterId, EdgeType)>>,
    order: Vec<ChapterId>,
}

impl CurriculumGraph {
    pub fn build(chapters: Vec<Chapter>) -> Result<Self, GraphIntegrityError> {
        let mut by_id: BTreeMap<ChapterId, Chapter> = BTreeMap::new();
        for chapter in chapters {
            if !(MIN_TIER..=MAX_TIER).contains(&chapter.difficulty_tier) {
                return Err(GraphIntegrityError::InvalidTier {
                    chapter: chapter.id.clone(),
                    tier: chapter.difficulty_tier,
                });
            }
            if by_id.contains_key(&chapter.id) {
                return Err(GraphIntegrityError::DuplicateChapter(chapter.id));
            }
            by_id.insert(chapter.id.clone(), chapter);
        }

        let mut successors: BTreeMap<ChapterId, Vec<(ChapterId, EdgeType)>> = BTreeMap::new();
        for chapter in by_id.values() {
            for prereq in &chapter.prerequisites {
                if prereq.edge == EdgeType::Reinforcement {
                    return Err(GraphIntegrityError::AuthoredReinforcement {
                        from: prereq.chapter_id.clone(),
                        to: chapter.id.clone(),
                    });
                }
                if !by_id.contains_key(&prereq.chapter_id) {
                    return Err(GraphIntegrityError::DanglingReference {
                        from: chapter.id.clone(),
                        to: prereq.chapter_id.clone(),
                    });
                }
                successors
                    .entry(prereq.chapter_id.clone())
                    .or_default()
                    .push((chapter.id.clone(), prereq.edge));
            }
        }
        for edges in successors.values_mut() {
            edges.sort();
        }

        let order = topological_sort(&by_id, &successors)?;

        Ok(Self {
            chapters: by_id,
            successors,
            order,
        })
    }

    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.chapters.get(chapter_id)
    }

    pub fn contains(&self, chapter_id: &str) -> bool {
        self.chapters.contains_key(chapter_id)
    }

    pub fn prerequisites_of(&self, chapter_id: &str) -> &[Prerequisite] {
        self.chapters
            .get(chapter_id)
            .map(|c| c.prerequisites.as_slice())
            .unwrap_or(&[])
    }

    pub fn successors_of(&self, chapter_id: &str) -> &[(ChapterId, EdgeType)] {
        self.successors
            .get(chapter_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Prerequisites always precede their dependents; ties are broken by id.
    pub fn topological_order(&self) -> &[ChapterId] {
        &self.order
    }

    pub fn chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.values()
    }

    /// Chapters of one curriculum in topological order.
    pub fn chapters_in<'a>(&'a self, curriculum_id: &'a str) -> impl Iterator<Item = &'a Chapter> {
        self.order
            .iter()
            .filter_map(|id| self.chapters.get(id))
            .filter(move |c| c.curriculum_id == curriculum_id)
    }

    pub fn curricula(&self) -> BTreeSet<&str> {
        self.chapters
            .values()
            .map(|c| c.curriculum_id.as_str())
            .collect()
    }

    pub fn has_curriculum(&self, curriculum_id: &str) -> bool {
        self.chapters.values().any(|c| c.curriculum_id == curriculum_id)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

/// Kahn's algorithm with an ordered ready set so the result is reproducible.
fn topological_sort(
    chapters: &BTreeMap<ChapterId, Chapter>,
    successors: &BTreeMap<ChapterId, Vec<(ChapterId, EdgeType)>>,
) -> Result<Vec<ChapterId>, GraphIntegrityError> {
    let mut in_degree: BTreeMap<&str, usize> = chapters
        .values()
        .map(|c| (c.id.as_str(), c.prerequisites.len()))
        .collect();

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(chapters.len());
    while let Some(id) = ready.pop_first() {
        order.push(id.to_string());
        for (next, _) in successors.get(id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(degree) = in_degree.get_mut(next.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(next.as_str());
                }
            }
        }
    }

    if order.len() < chapters.len() {
        let stuck: Vec<ChapterId> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        return Err(GraphIntegrityError::Cycle(stuck));
    }

    Ok(order)
}
