use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::engine::config::EngineConfig;
use crate::engine::graph::CurriculumGraph;
use crate::engine::mastery::subject_mastery;
use crate::engine::types::{Chapter, ChapterId, MasteryKey, MasteryMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub subject: String,
    pub chapter_id: ChapterId,
    pub message: String,
    pub priority: SuggestionPriority,
    pub shared_concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSubjectAdvice {
    pub weak_subject: String,
    pub avg_score: f64,
    pub attempts_count: usize,
    pub suggestions: Vec<Suggestion>,
}

pub struct CrossSubjectAdvisor<'a> {
    catalog: &'a CurriculumGraph,
    config: &'a EngineConfig,
}

struct Candidate<'c> {
    chapter: &'c Chapter,
    shared: Vec<String>,
    subject_weak: bool,
    subject_average: Option<f64>,
}

impl<'a> CrossSubjectAdvisor<'a> {
    pub fn new(catalog: &'a CurriculumGraph, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    pub fn advise(&self, mastery: &MasteryMap) -> Vec<CrossSubjectAdvice> {
        let mut advice: Vec<CrossSubjectAdvice> = mastery
            .iter()
            .filter_map(|(key, score)| match key {
                MasteryKey::Subject(subject) => Some((subject, score)),
                MasteryKey::Concept { .. } => None,
            })
            .filter(|(_, score)| {
                score.attempts_count >= self.config.cross_subject_min_attempts
                    && score.average_score < self.config.reinforcement_threshold
            })
            .filter_map(|(subject, score)| {
                let priority = self.priority_for(score.average_score)?;
                Some(CrossSubjectAdvice {
                    weak_subject: subject.clone(),
                    avg_score: score.average_score,
                    attempts_count: score.attempts_count,
                    suggestions: self.suggestions_for(subject, priority, mastery),
                })
            })
            .collect();

        advice.sort_by(|a, b| {
            a.avg_score
                .total_cmp(&b.avg_score)
                .then_with(|| a.weak_subject.cmp(&b.weak_subject))
        });
        advice
    }

    fn priority_for(&self, average: f64) -> Option<SuggestionPriority> {
        if average < self.config.cross_subject_high_gap {
            Some(SuggestionPriority::High)
        } else if average < self.config.reinforcement_threshold {
            Some(SuggestionPriority::Medium)
        } else {
            None
        }
    }

    fn weak_tags(&self, subject: &str, mastery: &MasteryMap) -> BTreeSet<String> {
        let attempted = mastery
            .keys()
            .filter(|k| k.subject_name() == subject)
            .filter_map(|k| k.concept_name().map(str::to_string));
        let authored = self
            .catalog
            .chapters()
            .filter(|c| c.subject == subject)
            .flat_map(|c| c.concept_tags.iter().cloned());
        attempted.chain(authored).collect()
    }

    fn suggestions_for(
        &self,
        weak_subject: &str,
        priority: SuggestionPriority,
        mastery: &MasteryMap,
    ) -> Vec<Suggestion> {
        let tags = self.weak_tags(weak_subject, mastery);

        let mut candidates: Vec<Candidate> = self
            .catalog
            .chapters()
            .filter(|c| c.subject != weak_subject && !c.is_remedial())
            .filter_map(|chapter| {
                let shared: Vec<String> = chapter.concept_tags.intersection(&tags).cloned().collect();
                if shared.is_empty() {
                    return None;
                }
                let own = subject_mastery(mastery, &chapter.subject);
                Some(Candidate {
                    chapter,
                    shared,
                    subject_weak: own.is_some_and(|m| {
                        m.average_score < self.config.reinforcement_threshold
                    }),
                    subject_average: own.map(|m| m.average_score),
                })
            })
            .collect();

        candidates.sort_by(rank_candidates);

        candidates
            .into_iter()
            .take(self.config.max_suggestions_per_subject)
            .map(|c| Suggestion {
                subject: c.chapter.subject.clone(),
                chapter_id: c.chapter.id.clone(),
                message: format!(
                    "reinforce {} ({}) with \"{}\" in {}",
                    weak_subject,
                    c.shared.join(", "),
                    c.chapter.display_name(),
                    c.chapter.subject
                ),
                priority,
                shared_concepts: c.shared,
            })
            .collect()
    }
}

/// Larger overlap first, then subjects the student is not weak in, then the
/// stronger subject, then chapter id.
fn rank_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.shared
        .len()
        .cmp(&a.shared.len())
        .then_with(|| a.subject_weak.cmp(&b.subject_weak))
        .then_with(|| match (a.subject_average, b.subject_average) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.chapter.id.cmp(&b.chapter.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{MasteryScore, Trend};

    fn chapter(id: &str, subject: &str, tags: &[&str]) -> Chapter {
        Chapter {
            id: id.to_string(),
            curriculum_id: format!("{subject}-3"),
            subject: subject.to_string(),
            title: None,
            concept_tags: tags.iter().map(|t| t.to_string()).collect(),
            difficulty_tier: 2,
            prerequisites: vec![],
            remedial_for: None,
        }
    }

    fn subject_score(subject: &str, avg: f64, attempts: usize) -> (MasteryKey, MasteryScore) {
        let key = MasteryKey::subject(subject);
        (
            key.clone(),
            MasteryScore {
                student_id: "s1".to_string(),
                key,
                average_score: avg,
                attempts_count: attempts,
                trend: Trend::Stable,
                last_attempt_at: None,
            },
        )
    }

    fn catalog() -> CurriculumGraph {
        CurriculumGraph::build(vec![
            chapter("math-1", "math", &["medidas", "proporciones"]),
            chapter("sci-1", "science", &["medidas", "proporciones"]),
            chapter("sci-2", "science", &["plantas"]),
            chapter("art-1", "art", &["proporciones"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_weak_subject_gets_ranked_suggestions() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let mastery: MasteryMap = [
            subject_score("math", 40.0, 5),
            subject_score("science", 85.0, 4),
        ]
        .into_iter()
        .collect();

        let advice = CrossSubjectAdvisor::new(&catalog, &config).advise(&mastery);
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].weak_subject, "math");
        let ids: Vec<&str> = advice[0].suggestions.iter().map(|s| s.chapter_id.as_str()).collect();
        assert_eq!(ids, ["sci-1", "art-1"]);
        assert_eq!(advice[0].suggestions[0].priority, SuggestionPriority::High);
    }

    #[test]
    fn test_thresholds() {
        let catalog = catalog();
        let config = EngineConfig::default();
        let advisor = CrossSubjectAdvisor::new(&catalog, &config);

        let few_attempts: MasteryMap = [subject_score("math", 10.0, 2)].into_iter().collect();
        assert!(advisor.advise(&few_attempts).is_empty());

        let passing: MasteryMap = [subject_score("math", 70.0, 9)].into_iter().collect();
        assert!(advisor.advise(&passing).is_empty());

        let medium: MasteryMap = [subject_score("math", 50.0, 3)].into_iter().collect();
        let advice = advisor.advise(&medium);
        assert_eq!(advice[0].suggestions[0].priority, SuggestionPriority::Medium);
    }

    #[test]
    fn test_prefers_subject_student_is_not_weak_in() {
        let catalog = CurriculumGraph::build(vec![
            chapter("math-1", "math", &["medidas"]),
            chapter("art-1", "art", &["medidas"]),
            chapter("sci-1", "science", &["medidas"]),
        ])
        .unwrap();
        let config = EngineConfig::default();
        let mastery: MasteryMap = [
            subject_score("math", 30.0, 5),
            subject_score("art", 20.0, 5),
        ]
        .into_iter()
        .collect();

        let advice = CrossSubjectAdvisor::new(&catalog, &config).advise(&mastery);
        let math = advice.iter().find(|a| a.weak_subject == "math").unwrap();
        assert_eq!(math.suggestions[0].chapter_id, "sci-1");
        assert_eq!(advice[0].weak_subject, "art");
    }
}
