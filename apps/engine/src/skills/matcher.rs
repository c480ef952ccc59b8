//! Skill Matcher: buckets job requirements into matching / missing /
//! to-advance against a candidate's declared skills and resume prose.
//!
//! Evidence tiers, strongest first:
//! 1. declared skill with equal canonical form -> matching
//! 2. repeated textual evidence in the resume (>= reinforcement threshold) -> matching
//! 3. single weak textual mention -> to-advance ("has touched it")
//! 4. no evidence -> missing
//!
//! Each deduped requirement lands in exactly one bucket. Total over its
//! inputs: empty or malformed strings are no-evidence, never errors.

use std::collections::HashSet;

use serde::Serialize;

use crate::skills::normalizer::{SkillNormalizer, SkillTerm};

/// Tuning knobs for evidence search. Data, not logic: phrasing patterns and
/// the reinforcement threshold vary by deployment, so they live here.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Patterns scanned against resume prose; `{}` is replaced with each
    /// surface form of the requirement. The bare `{}` pattern is the
    /// word-boundary scan.
    pub phrase_patterns: Vec<String>,
    /// Mentions required before textual evidence alone counts as full
    /// proficiency rather than to-advance.
    pub reinforcement_threshold: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            phrase_patterns: vec![
                "using {}".to_string(),
                "with {}".to_string(),
                "{}".to_string(),
            ],
            reinforcement_threshold: 2,
        }
    }
}

/// The skill fields of a gap analysis. Invariant: the three lists are
/// disjoint and jointly cover every deduped job requirement.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SkillBuckets {
    pub matching: Vec<SkillTerm>,
    pub missing: Vec<SkillTerm>,
    pub to_advance: Vec<SkillTerm>,
}

impl SkillBuckets {
    pub fn requirement_count(&self) -> usize {
        self.matching.len() + self.missing.len() + self.to_advance.len()
    }
}

pub struct SkillMatcher {
    normalizer: SkillNormalizer,
    config: MatcherConfig,
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self::new(SkillNormalizer::new())
    }
}

impl SkillMatcher {
    pub fn new(normalizer: SkillNormalizer) -> Self {
        Self::with_config(normalizer, MatcherConfig::default())
    }

    pub fn with_config(normalizer: SkillNormalizer, config: MatcherConfig) -> Self {
        Self { normalizer, config }
    }

    pub fn normalizer(&self) -> &SkillNormalizer {
        &self.normalizer
    }

    /// Buckets every job requirement by the strongest evidence tier found.
    pub fn match_skills(
        &self,
        declared_skills: &[String],
        resume_text: &str,
        job_requirements: &[String],
    ) -> SkillBuckets {
        let declared: HashSet<String> = declared_skills
            .iter()
            .map(|s| self.normalizer.normalize(s).canonical)
            .filter(|c| !c.is_empty())
            .collect();

        let resume_lower = resume_text.to_lowercase();

        let mut seen: HashSet<String> = HashSet::new();
        let mut buckets = SkillBuckets::default();

        for requirement in job_requirements {
            let term = self.normalizer.normalize(requirement);
            if term.canonical.is_empty() || !seen.insert(term.canonical.clone()) {
                continue; // absent input or duplicate after normalization
            }

            if declared.contains(&term.canonical) {
                buckets.matching.push(term);
                continue;
            }

            let mentions = self.count_mentions(&resume_lower, &term);
            if mentions >= self.config.reinforcement_threshold {
                buckets.matching.push(term);
            } else if mentions > 0 {
                buckets.to_advance.push(term);
            } else {
                buckets.missing.push(term);
            }
        }

        buckets
    }

    /// Counts textual mentions of a requirement in lowercased resume prose.
    ///
    /// The count is the max across surface forms and patterns so one
    /// occurrence of "react.js" is never double counted as both "react.js"
    /// and "react".
    fn count_mentions(&self, resume_lower: &str, term: &SkillTerm) -> usize {
        if resume_lower.is_empty() {
            return 0;
        }
        let mut best = 0;
        for form in self.normalizer.surface_forms(term) {
            for pattern in &self.config.phrase_patterns {
                let phrase = pattern.replace("{}", &form);
                best = best.max(boundary_count(resume_lower, &phrase));
            }
        }
        best
    }
}

/// Counts non-overlapping occurrences of `needle` in `haystack` where both
/// ends fall on word boundaries, so "react" does not match inside
/// "reactive" but does match in "react.js".
fn boundary_count(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut from = 0;
    while let Some(found) = haystack[from..].find(needle) {
        let start = from + found;
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            count += 1;
        }
        from = end;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> SkillMatcher {
        SkillMatcher::default()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn canonicals(terms: &[SkillTerm]) -> Vec<&str> {
        terms.iter().map(|t| t.canonical.as_str()).collect()
    }

    #[test]
    fn test_declared_skill_is_matching() {
        let buckets = matcher().match_skills(
            &strings(&["JavaScript"]),
            "",
            &strings(&["JavaScript"]),
        );
        assert_eq!(canonicals(&buckets.matching), vec!["javascript"]);
        assert!(buckets.missing.is_empty());
    }

    #[test]
    fn test_single_textual_mention_is_to_advance() {
        let buckets = matcher().match_skills(
            &strings(&["JavaScript", "Node.js"]),
            "built REST APIs using Express.js for an internal tool",
            &strings(&["JavaScript", "Express.js", "Docker"]),
        );
        assert!(canonicals(&buckets.matching).contains(&"javascript"));
        assert!(canonicals(&buckets.to_advance).contains(&"express.js"));
        assert!(canonicals(&buckets.missing).contains(&"docker"));
    }

    #[test]
    fn test_repeated_mentions_promote_to_matching() {
        let resume = "Shipped Docker images daily. Wrote Docker Compose files \
                      and tuned Docker build caching.";
        let buckets = matcher().match_skills(&[], resume, &strings(&["Docker"]));
        assert_eq!(canonicals(&buckets.matching), vec!["docker"]);
    }

    #[test]
    fn test_partition_invariant() {
        let requirements = strings(&["Rust", "Go", "Kubernetes", "SQL", "React"]);
        let buckets = matcher().match_skills(
            &strings(&["Rust"]),
            "Deployed services to Kubernetes. Some exposure to React.",
            &requirements,
        );
        assert_eq!(buckets.requirement_count(), requirements.len());

        let mut all: Vec<&str> = canonicals(&buckets.matching);
        all.extend(canonicals(&buckets.missing));
        all.extend(canonicals(&buckets.to_advance));
        let unique: HashSet<&str> = all.iter().copied().collect();
        assert_eq!(unique.len(), all.len(), "buckets overlap: {all:?}");
    }

    #[test]
    fn test_duplicate_requirements_deduped() {
        let buckets = matcher().match_skills(
            &strings(&["React"]),
            "",
            &strings(&["React", "React.js", "ReactJS"]),
        );
        assert_eq!(buckets.requirement_count(), 1);
        assert_eq!(canonicals(&buckets.matching), vec!["react"]);
    }

    #[test]
    fn test_alias_evidence_found_in_text() {
        // resume says "k8s", requirement says "Kubernetes"
        let buckets = matcher().match_skills(
            &[],
            "Migrated workloads to k8s",
            &strings(&["Kubernetes"]),
        );
        assert_eq!(canonicals(&buckets.to_advance), vec!["kubernetes"]);
    }

    #[test]
    fn test_word_boundary_rejects_substrings() {
        let buckets = matcher().match_skills(
            &[],
            "Focused on reactive UI programming",
            &strings(&["React"]),
        );
        assert_eq!(canonicals(&buckets.missing), vec!["react"]);
    }

    #[test]
    fn test_empty_requirements_yield_empty_buckets() {
        let buckets = matcher().match_skills(&strings(&["Rust"]), "some resume", &[]);
        assert_eq!(buckets.requirement_count(), 0);
    }

    #[test]
    fn test_blank_requirement_strings_skipped() {
        let buckets = matcher().match_skills(&[], "", &strings(&["", "   ", "Rust"]));
        assert_eq!(buckets.requirement_count(), 1);
        assert_eq!(canonicals(&buckets.missing), vec!["rust"]);
    }

    #[test]
    fn test_boundary_count_basics() {
        assert_eq!(boundary_count("go go go", "go"), 3);
        assert_eq!(boundary_count("golang", "go"), 0);
        assert_eq!(boundary_count("c++ and c#", "c++"), 1);
        assert_eq!(boundary_count("", "go"), 0);
        assert_eq!(boundary_count("anything", ""), 0);
    }
}
