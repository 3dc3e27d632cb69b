//! Reduces raw attempt history into subject- and concept-level mastery.
//!
//! A key with no attempts in the window is absent from the result. Callers
//! treat absence as "no data", which is not the same as a zero average.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::config::EngineConfig;
use crate::engine::types::{AttemptRecord, MasteryKey, MasteryMap, MasteryScore, Trend};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryWindow {
    pub subject: Option<String>,
    /// Keep only the K most recent attempts of every key.
    pub last_attempts: Option<usize>,
    /// Drop attempts completed before this instant.
    pub since: Option<DateTime<Utc>>,
}

impl MasteryWindow {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    pub fn last_attempts(mut self, k: usize) -> Self {
        self.last_attempts = Some(k);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn last_days(self, days: i64, as_of: DateTime<Utc>) -> Self {
        self.since(as_of - Duration::days(days.max(0)))
    }

    /// Stable identifier used in cache keys.
    pub fn period_label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(k) = self.last_attempts {
            parts.push(format!("last{k}"));
        }
        if let Some(since) = self.since {
            parts.push(format!("since{}", since.timestamp()));
        }
        if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join("-")
        }
    }
}

pub struct MasterySummarizer {
    trend_delta: f64,
}

impl MasterySummarizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            trend_delta: config.trend_delta,
        }
    }

    pub fn summarize(
        &self,
        student_id: &str,
        attempts: &[AttemptRecord],
        window: &MasteryWindow,
    ) -> MasteryMap {
        let mut in_window: Vec<&AttemptRecord> = attempts
            .iter()
            .filter(|a| a.student_id == student_id)
            .filter(|a| window.subject.as_deref().map_or(true, |s| a.subject == s))
            .filter(|a| window.since.map_or(true, |since| a.completed_at >= since))
            .collect();
        in_window.sort_by_key(|a| a.completed_at);

        let mut groups: BTreeMap<MasteryKey, Vec<&AttemptRecord>> = BTreeMap::new();
        for attempt in in_window {
            groups
                .entry(MasteryKey::subject(attempt.subject.as_str()))
                .or_default()
                .push(attempt);
            groups
                .entry(MasteryKey::concept(
                    attempt.subject.as_str(),
                    attempt.concept.as_str(),
                ))
                .or_default()
                .push(attempt);
        }

        groups
            .into_iter()
            .filter_map(|(key, mut group)| {
                if let Some(k) = window.last_attempts {
                    let skip = group.len().saturating_sub(k);
                    group.drain(..skip);
                }
                let score = self.score_group(student_id, key.clone(), &group)?;
                Some((key, score))
            })
            .collect()
    }

    fn score_group(
        &self,
        student_id: &str,
        key: MasteryKey,
        group: &[&AttemptRecord],
    ) -> Option<MasteryScore> {
        if group.is_empty() {
            return None;
        }

        let scores: Vec<f64> = group.iter().map(|a| a.score).collect();
        Some(MasteryScore {
            student_id: student_id.to_string(),
            key,
            average_score: mean(&scores),
            attempts_count: scores.len(),
            trend: classify_trend(&scores, self.trend_delta),
            last_attempt_at: group.last().map(|a| a.completed_at),
        })
    }
}

/// Older half is the first `n / 2` scores; the recent half gets the extra one.
pub fn classify_trend(scores: &[f64], delta: f64) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }

    let mid = scores.len() / 2;
    let diff = mean(&scores[mid..]) - mean(&scores[..mid]);

    if diff >= delta {
        Trend::Up
    } else if diff <= -delta {
        Trend::Down
    } else {
        Trend::Stable
    }
}

pub fn concept_mastery<'a>(
    mastery: &'a MasteryMap,
    subject: &str,
    concept: &str,
) -> Option<&'a MasteryScore> {
    mastery.get(&MasteryKey::concept(subject, concept))
}

pub fn subject_mastery<'a>(mastery: &'a MasteryMap, subject: &str) -> Option<&'a MasteryScore> {
    mastery.get(&MasteryKey::subject(subject))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
