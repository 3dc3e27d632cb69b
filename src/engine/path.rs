use crate::engine::graph::CurriculumGraph;
use crate::engine::types::{Chapter, EdgeType, Priority, Recommendation};
use crate::engine::unlock::{ChapterEvaluation, UnlockReport};

pub struct PathRecommender<'a> {
    graph: &'a CurriculumGraph,
    bonus_threshold: f64,
}

impl<'a> PathRecommender<'a> {
    pub fn new(graph: &'a CurriculumGraph, bonus_threshold: f64) -> Self {
        Self {
            graph,
            bonus_threshold,
        }
    }

    /// Frontier chapters ordered by `(priority, chapter id)`, truncated to `limit`.
    pub fn recommend(&self, report: &UnlockReport, limit: usize) -> Vec<Recommendation> {
        let mut ranked: Vec<(Priority, &ChapterEvaluation)> = report
            .frontier()
            .filter_map(|eval| {
                let priority = eval.unlocked_via.iter().copied().map(Priority::from).min()?;
                Some((priority, eval))
            })
            .collect();

        ranked.sort_by(|(pa, a), (pb, b)| pa.cmp(pb).then_with(|| a.chapter_id.cmp(&b.chapter_id)));

        ranked
            .into_iter()
            .take(limit)
            .map(|(priority, eval)| Recommendation {
                chapter_id: eval.chapter_id.clone(),
                priority,
                reason: self.reason(report, eval, priority),
            })
            .collect()
    }

    fn reason(&self, report: &UnlockReport, eval: &ChapterEvaluation, priority: Priority) -> String {
        let chapter = self.graph.chapter(&eval.chapter_id);

        match priority {
            Priority::Reinforcement => match report.trigger_for(&eval.chapter_id) {
                Some(trigger) => format!(
                    "mastery {:.0}% in {}: reinforcement recommended",
                    trigger.average_score, trigger.concept
                ),
                None => "review chapter: reinforcement recommended".to_string(),
            },
            Priority::Linear => match chapter {
                Some(c) if has_edge(c, EdgeType::Linear) => {
                    format!("next step after {}", self.prerequisite_names(c, EdgeType::Linear))
                }
                Some(c) => format!("starting point of {}", c.curriculum_id),
                None => "next step".to_string(),
            },
            Priority::Alternative => match chapter.and_then(|c| self.bonus_source(report, c)) {
                Some((name, score)) => {
                    format!("bonus content unlocked by {score:.0}% in {name}")
                }
                None => "bonus content".to_string(),
            },
        }
    }

    fn prerequisite_names(&self, chapter: &Chapter, edge: EdgeType) -> String {
        chapter
            .prerequisites
            .iter()
            .filter(|p| p.edge == edge)
            .map(|p| {
                self.graph
                    .chapter(&p.chapter_id)
                    .map_or(p.chapter_id.as_str(), |c| c.display_name())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Highest-scoring alternative predecessor at or above the bonus threshold.
    fn bonus_source<'r>(
        &'r self,
        report: &'r UnlockReport,
        chapter: &'r Chapter,
    ) -> Option<(&'r str, f64)> {
        chapter
            .prerequisites
            .iter()
            .filter(|p| p.edge == EdgeType::Alternative)
            .filter_map(|p| {
                let eval = report.chapters.get(&p.chapter_id)?;
                (eval.best_score >= self.bonus_threshold).then_some((p.chapter_id.as_str(), eval.best_score))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, score)| {
                let name = self.graph.chapter(id).map_or(id, |c| c.display_name());
                (name, score)
            })
    }
}

fn has_edge(chapter: &Chapter, edge: EdgeType) -> bool {
    chapter.prerequisites.iter().any(|p| p.edge == edge)
}
