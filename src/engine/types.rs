use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type ChapterId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Linear,
    Alternative,
    Reinforcement,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Alternative => "alternative",
            Self::Reinforcement => "reinforcement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prerequisite {
    pub chapter_id: ChapterId,
    #[serde(rename = "type")]
    pub edge: EdgeType,
}

impl Prerequisite {
    pub fn linear(chapter_id: impl Into<ChapterId>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            edge: EdgeType::Linear,
        }
    }

    pub fn alternative(chapter_id: impl Into<ChapterId>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            edge: EdgeType::Alternative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub curriculum_id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub concept_tags: BTreeSet<String>,
    pub difficulty_tier: u8,
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
    /// Concept this chapter remediates. Only reachable through reinforcement
    /// unless it also has authored prerequisites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedial_for: Option<String>,
}

impl Chapter {
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    pub fn is_remedial(&self) -> bool {
        self.remedial_for.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub student_id: String,
    pub subject: String,
    pub concept: String,
    pub score: f64,
    #[serde(default)]
    pub time_spent_seconds: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

/// Mastery is tracked per subject and per concept within a subject.
/// Rendered as `subject` or `subject|concept`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MasteryKey {
    Subject(String),
    Concept { subject: String, concept: String },
}

impl MasteryKey {
    pub fn subject(subject: impl Into<String>) -> Self {
        Self::Subject(subject.into())
    }

    pub fn concept(subject: impl Into<String>, concept: impl Into<String>) -> Self {
        Self::Concept {
            subject: subject.into(),
            concept: concept.into(),
        }
    }

    pub fn subject_name(&self) -> &str {
        match self {
            Self::Subject(subject) => subject,
            Self::Concept { subject, .. } => subject,
        }
    }

    pub fn concept_name(&self) -> Option<&str> {
        match self {
            Self::Subject(_) => None,
            Self::Concept { concept, .. } => Some(concept),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.split_once('|') {
            Some((subject, concept)) => Self::concept(subject, concept),
            None => Self::subject(raw),
        }
    }
}

impl fmt::Display for MasteryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject(subject) => write!(f, "{subject}"),
            Self::Concept { subject, concept } => write!(f, "{subject}|{concept}"),
        }
    }
}

impl Serialize for MasteryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MasteryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryScore {
    pub student_id: String,
    pub key: MasteryKey,
    pub average_score: f64,
    pub attempts_count: usize,
    pub trend: Trend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

pub type MasteryMap = BTreeMap<MasteryKey, MasteryScore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ChapterState {
    #[default]
    Locked,
    Unlocked,
    Completed,
}

impl ChapterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgress {
    pub student_id: String,
    pub chapter_id: ChapterId,
    #[serde(default)]
    pub state: ChapterState,
    #[serde(default)]
    pub best_score: f64,
    #[serde(default)]
    pub attempts: u32,
}

/// Lower value is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Reinforcement = 1,
    Linear = 2,
    Alternative = 3,
}

impl Priority {
    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Reinforcement),
            2 => Some(Self::Linear),
            3 => Some(Self::Alternative),
            _ => None,
        }
    }
}

impl From<EdgeType> for Priority {
    fn from(edge: EdgeType) -> Self {
        match edge {
            EdgeType::Reinforcement => Self::Reinforcement,
            EdgeType::Linear => Self::Linear,
            EdgeType::Alternative => Self::Alternative,
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::from_value(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid priority {value}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub chapter_id: ChapterId,
    pub priority: Priority,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Pace {
    Slow,
    #[default]
    Medium,
    Fast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: String,
    #[serde(default)]
    pub pace: Pace,
    #[serde(default)]
    pub strong_concepts: BTreeSet<String>,
    #[serde(default)]
    pub weak_concepts: BTreeSet<String>,
}

impl StudentProfile {
    pub fn new(student_id: impl Into<String>, pace: Pace) -> Self {
        Self {
            student_id: student_id.into(),
            pace,
            strong_concepts: BTreeSet::new(),
            weak_concepts: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mastery_key_string_form() {
        let key = MasteryKey::concept("math", "fracciones");
        assert_eq!(key.to_string(), "math|fracciones");
        assert_eq!(MasteryKey::parse("math|fracciones"), key);
        assert_eq!(MasteryKey::parse("math"), MasteryKey::subject("math"));
    }

    #[test]
    fn test_priority_ordering_matches_urgency() {
        assert!(Priority::Reinforcement < Priority::Linear);
        assert!(Priority::Linear < Priority::Alternative);
        assert_eq!(serde_json::to_string(&Priority::Linear).unwrap(), "2");
        assert!(serde_json::from_str::<Priority>("7").is_err());
    }

    #[test]
    fn test_mastery_map_serializes_with_string_keys() {
        let mut map = MasteryMap::new();
        let key = MasteryKey::concept("math", "sumas");
        map.insert(
            key.clone(),
            MasteryScore {
                student_id: "s1".to_string(),
                key,
                average_score: 80.0,
                attempts_count: 2,
                trend: Trend::Stable,
                last_attempt_at: None,
            },
        );

        let json = serde_json::to_value(&map).unwrap();
        assert!(json.get("math|sumas").is_some());
        let back: MasteryMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }
}
