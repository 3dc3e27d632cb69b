use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::engine::config::DifficultyParams;
use crate::engine::types::{MasteryScore, Pace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyDecision {
    pub value: f64,
    pub adjustments: Vec<String>,
}

pub struct DifficultyAdapter {
    params: DifficultyParams,
}

impl DifficultyAdapter {
    pub fn new(params: DifficultyParams) -> Self {
        Self { params }
    }

    /// Additive, bounded adjustments: pace and concept mastery each move the
    /// value by at most one step before clamping.
    pub fn decide(
        &self,
        pace: Pace,
        concept: &str,
        mastery: Option<&MasteryScore>,
        strong_concepts: &BTreeSet<String>,
        weak_concepts: &BTreeSet<String>,
    ) -> DifficultyDecision {
        let p = &self.params;
        let mut value = p.base;
        let mut adjustments = Vec::new();

        match pace {
            Pace::Slow => {
                value -= p.pace_step;
                adjustments.push(format!("slow pace -{:.1}", p.pace_step));
            }
            Pace::Fast => {
                value += p.pace_step;
                adjustments.push(format!("fast pace +{:.1}", p.pace_step));
            }
            Pace::Medium => {}
        }

        match mastery {
            None => adjustments.push(format!("no attempts in {concept}, baseline")),
            Some(m) if m.average_score >= p.strong_mastery => {
                value += p.mastery_step;
                adjustments.push(format!(
                    "mastery {:.0}% in {concept} +{:.1}",
                    m.average_score, p.mastery_step
                ));
            }
            Some(m) if m.average_score <= p.weak_mastery => {
                value -= p.mastery_step;
                adjustments.push(format!(
                    "mastery {:.0}% in {concept} -{:.1}",
                    m.average_score, p.mastery_step
                ));
            }
            Some(_) => {}
        }

        if strong_concepts.contains(concept) {
            adjustments.push(format!("{concept} listed as strong"));
        }
        if weak_concepts.contains(concept) {
            adjustments.push(format!("{concept} listed as weak"));
        }

        DifficultyDecision {
            value: round2(value.clamp(p.min, p.max)),
            adjustments,
        }
    }
}

impl Default for DifficultyAdapter {
    fn default() -> Self {
        Self::new(DifficultyParams::default())
    }
}

// Keeps 0.5 - 0.2 - 0.2 at exactly 0.1 instead of 0.09999999999999998.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{MasteryKey, Trend};

    fn mastery(avg: f64) -> MasteryScore {
        MasteryScore {
            student_id: "s1".to_string(),
            key: MasteryKey::concept("math", "sumas"),
            average_score: avg,
            attempts_count: 3,
            trend: Trend::Stable,
            last_attempt_at: None,
        }
    }

    fn decide(pace: Pace, m: Option<&MasteryScore>) -> f64 {
        DifficultyAdapter::default()
            .decide(pace, "sumas", m, &BTreeSet::new(), &BTreeSet::new())
            .value
    }

    #[test]
    fn test_absent_mastery_is_pace_only() {
        assert_eq!(decide(Pace::Medium, None), 0.5);
        assert_eq!(decide(Pace::Slow, None), 0.3);
        assert_eq!(decide(Pace::Fast, None), 0.7);
    }

    #[test]
    fn test_mastery_boundaries() {
        assert_eq!(decide(Pace::Medium, Some(&mastery(80.0))), 0.7);
        assert_eq!(decide(Pace::Medium, Some(&mastery(79.9))), 0.5);
        assert_eq!(decide(Pace::Medium, Some(&mastery(50.0))), 0.3);
        assert_eq!(decide(Pace::Medium, Some(&mastery(50.1))), 0.5);
    }

    #[test]
    fn test_clamped_to_band() {
        assert_eq!(decide(Pace::Slow, Some(&mastery(10.0))), 0.1);
        assert_eq!(decide(Pace::Fast, Some(&mastery(100.0))), 0.9);

        let aggressive = DifficultyParams {
            pace_step: 0.4,
            ..DifficultyParams::default()
        };
        let value = DifficultyAdapter::new(aggressive)
            .decide(Pace::Fast, "sumas", Some(&mastery(95.0)), &BTreeSet::new(), &BTreeSet::new())
            .value;
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_explicit_tags_do_not_move_value() {
        let strong: BTreeSet<String> = ["sumas".to_string()].into_iter().collect();
        let decision =
            DifficultyAdapter::default().decide(Pace::Medium, "sumas", None, &strong, &BTreeSet::new());
        assert_eq!(decision.value, 0.5);
        assert!(decision.adjustments.iter().any(|a| a.contains("strong")));
    }
}
