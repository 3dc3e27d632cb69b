pub fn student_prefix(student_id: &str) -> String {
    format!("progress:{}:", student_id)
}

pub fn mastery_key(student_id: &str, subject: Option<&str>, period: &str) -> String {
    format!("progress:{}:mastery:{}:{}", student_id, subject.unwrap_or("*"), period)
}

pub fn difficulty_key(student_id: &str, subject: &str, concept: &str) -> String {
    format!("progress:{}:difficulty:{}|{}:all", student_id, subject, concept)
}

pub fn unlocks_key(student_id: &str, curriculum_id: &str) -> String {
    format!("progress:{}:unlocks:{}:all", student_id, curriculum_id)
}

pub fn path_key(student_id: &str, curriculum_id: &str, limit: usize) -> String {
    format!("progress:{}:path:{}:top{}", student_id, curriculum_id, limit)
}

pub fn cross_subject_key(student_id: &str) -> String {
    format!("progress:{}:cross-subject:*:all", student_id)
}

pub fn map_stats_key(student_id: &str, curriculum_id: &str) -> String {
    format!("progress:{}:stats:{}:all", student_id, curriculum_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_shares_the_student_prefix() {
        let prefix = student_prefix("s1");
        for key in [
            mastery_key("s1", Some("math"), "all"),
            difficulty_key("s1", "math", "sumas"),
            unlocks_key("s1", "math-3"),
            path_key("s1", "math-3", 5),
            cross_subject_key("s1"),
            map_stats_key("s1", "math-3"),
        ] {
            assert!(key.starts_with(&prefix), "{key}");
        }
        assert!(!mastery_key("s10", None, "all").starts_with(&prefix));
    }
}
