//! Analysis Engine: orchestrates the full gap-analysis pipeline.
//!
//! Flow: deterministic skill matching -> one LLM call through the provider
//! chain -> strict parse -> merge, or deterministic fallback.
//!
//! The deterministic pass always runs first, so a usable skill breakdown
//! exists before any network I/O. Provider and parse failures degrade to
//! the deterministic result; they are not errors at this boundary. The
//! `source` tag tells callers which path produced the analysis so degraded
//! results are never silently served as full ones.

pub mod parser;
pub mod prompts;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::provider::{CancelToken, ChainError, CompletionRequest, ProviderChain};
use crate::skills::{SkillBuckets, SkillMatcher, SkillTerm};

use parser::{parse_analysis, LlmAnalysis, ParsedAnalysis};
use prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Candidate-side input. Resume text is already extracted from whatever
/// source format; this crate performs no file I/O.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub resume_text: String,
    pub declared_skills: Vec<String>,
}

/// Job-side input as supplied by the calling application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchLevel {
    Poor,
    Fair,
    Good,
    Strong,
    Excellent,
}

impl MatchLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=29 => Self::Poor,
            30..=49 => Self::Fair,
            50..=69 => Self::Good,
            70..=84 => Self::Strong,
            _ => Self::Excellent,
        }
    }
}

/// Which path produced the analysis, for honest presentation to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisSource {
    Ai,
    DeterministicFallback,
}

/// The complete gap analysis. Produced once per (resume, job) pair and
/// immutable afterwards; the conversation and plan modules read it only.
///
/// `overall_score` and `level` are `None` when the job carried no
/// requirements: not applicable is not zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub matching_skills: Vec<SkillTerm>,
    pub missing_skills: Vec<SkillTerm>,
    pub skills_to_advance: Vec<SkillTerm>,
    pub overall_score: Option<u8>,
    pub level: Option<MatchLevel>,
    pub strengths: Vec<String>,
    pub summary: String,
    pub source: AnalysisSource,
}

impl GapAnalysis {
    pub fn requirement_count(&self) -> usize {
        self.matching_skills.len() + self.missing_skills.len() + self.skills_to_advance.len()
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Resume text and job text were both empty; not even the deterministic
    /// fallback can say anything useful.
    #[error("resume text and job text are both empty")]
    MissingInput,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct AnalysisEngine {
    chain: Arc<ProviderChain>,
    matcher: SkillMatcher,
}

impl AnalysisEngine {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self::with_matcher(chain, SkillMatcher::default())
    }

    pub fn with_matcher(chain: Arc<ProviderChain>, matcher: SkillMatcher) -> Self {
        Self { chain, matcher }
    }

    /// Produces a gap analysis for one (candidate, job) pair.
    ///
    /// Never returns "no analysis" while either resume or job text is
    /// non-empty; the worst case is a lower-fidelity deterministic result.
    pub async fn analyze(
        &self,
        candidate: &CandidateProfile,
        job: &JobPosting,
    ) -> Result<GapAnalysis, AnalysisError> {
        let has_resume = !candidate.resume_text.trim().is_empty();
        let has_job = !job.title.trim().is_empty()
            || !job.description.trim().is_empty()
            || job.requirements.iter().any(|r| !r.trim().is_empty());
        if !has_resume && !has_job {
            return Err(AnalysisError::MissingInput);
        }

        let buckets = self.matcher.match_skills(
            &candidate.declared_skills,
            &candidate.resume_text,
            &job.requirements,
        );
        info!(
            matching = buckets.matching.len(),
            missing = buckets.missing.len(),
            to_advance = buckets.to_advance.len(),
            "deterministic skill pass complete"
        );

        let prompt = build_analysis_prompt(candidate, job, &buckets);
        let request = CompletionRequest::new(prompt, ANALYSIS_SYSTEM);
        // Analysis is not cancellable; only conversation turns are.
        let cancel = CancelToken::new();

        match self.chain.run(&request, &cancel).await {
            Ok(outcome) => match parse_analysis(&outcome.text) {
                ParsedAnalysis::Parsed(llm) => {
                    info!(provider = %outcome.provider_id, "analysis enriched by LLM");
                    Ok(merge_llm_analysis(&self.matcher, llm, buckets))
                }
                ParsedAnalysis::Unparseable(_) => {
                    warn!(
                        provider = %outcome.provider_id,
                        "unparseable LLM analysis, using deterministic fallback"
                    );
                    Ok(deterministic_analysis(buckets))
                }
            },
            Err(ChainError::AllProvidersFailed { attempts }) => {
                warn!(
                    attempts = attempts.len(),
                    "all providers failed, using deterministic fallback"
                );
                Ok(deterministic_analysis(buckets))
            }
            Err(ChainError::Cancelled { .. }) => Ok(deterministic_analysis(buckets)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Merge and fallback
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Matching,
    ToAdvance,
    Missing,
}

/// Adopts the LLM's bucket adjustments while preserving the partition over
/// the deterministic requirement set: every requirement keeps exactly one
/// bucket, and skills the LLM invented are ignored.
fn merge_llm_analysis(
    matcher: &SkillMatcher,
    llm: LlmAnalysis,
    deterministic: SkillBuckets,
) -> GapAnalysis {
    let mut placement: HashMap<String, Bucket> = HashMap::new();
    for (names, bucket) in [
        (&llm.matching_skills, Bucket::Matching),
        (&llm.skills_to_advance, Bucket::ToAdvance),
        (&llm.missing_skills, Bucket::Missing),
    ] {
        for name in names {
            let canonical = matcher.normalizer().normalize(name).canonical;
            // first placement wins so the LLM cannot double-bucket a skill
            placement.entry(canonical).or_insert(bucket);
        }
    }

    let mut matching = Vec::new();
    let mut to_advance = Vec::new();
    let mut missing = Vec::new();
    let deterministic_terms = deterministic
        .matching
        .into_iter()
        .map(|t| (t, Bucket::Matching))
        .chain(deterministic.to_advance.into_iter().map(|t| (t, Bucket::ToAdvance)))
        .chain(deterministic.missing.into_iter().map(|t| (t, Bucket::Missing)));
    for (term, default_bucket) in deterministic_terms {
        let bucket = placement
            .get(&term.canonical)
            .copied()
            .unwrap_or(default_bucket);
        match bucket {
            Bucket::Matching => matching.push(term),
            Bucket::ToAdvance => to_advance.push(term),
            Bucket::Missing => missing.push(term),
        }
    }

    let requirement_count = matching.len() + to_advance.len() + missing.len();
    let overall_score = if requirement_count == 0 {
        None
    } else {
        Some(llm.overall_score.min(100))
    };

    GapAnalysis {
        matching_skills: matching,
        missing_skills: missing,
        skills_to_advance: to_advance,
        overall_score,
        level: overall_score.map(MatchLevel::from_score),
        strengths: llm.strengths,
        summary: llm.summary,
        source: AnalysisSource::Ai,
    }
}

/// Builds the deterministic-only analysis used when the LLM path fails.
fn deterministic_analysis(buckets: SkillBuckets) -> GapAnalysis {
    let score = deterministic_score(&buckets);
    let summary = build_fallback_summary(score, &buckets);
    let strengths = buckets
        .matching
        .iter()
        .take(5)
        .map(|t| t.canonical.clone())
        .collect();

    GapAnalysis {
        matching_skills: buckets.matching,
        missing_skills: buckets.missing,
        skills_to_advance: buckets.to_advance,
        overall_score: score,
        level: score.map(MatchLevel::from_score),
        strengths,
        summary,
        source: AnalysisSource::DeterministicFallback,
    }
}

/// `round(100 * |matching| / total)`, undefined when there are no
/// requirements.
pub fn deterministic_score(buckets: &SkillBuckets) -> Option<u8> {
    let total = buckets.requirement_count();
    if total == 0 {
        return None;
    }
    Some((100.0 * buckets.matching.len() as f64 / total as f64).round() as u8)
}

fn build_fallback_summary(score: Option<u8>, buckets: &SkillBuckets) -> String {
    let Some(score) = score else {
        return "The job posting listed no skill requirements, so a match score is \
                not applicable. Review the role description directly to judge fit."
            .to_string();
    };

    let gaps: Vec<&str> = buckets
        .missing
        .iter()
        .chain(buckets.to_advance.iter())
        .take(3)
        .map(|t| t.canonical.as_str())
        .collect();

    if score >= 80 {
        "Strong match. The resume covers nearly all of the job's required skills."
            .to_string()
    } else if score >= 50 {
        format!(
            "Moderate match ({score}/100). Focus on closing these gaps: {}.",
            gaps.join(", ")
        )
    } else {
        format!(
            "Low match ({score}/100). Significant gaps to address before applying: {}.",
            gaps.join(", ")
        )
    }
}

fn build_analysis_prompt(
    candidate: &CandidateProfile,
    job: &JobPosting,
    buckets: &SkillBuckets,
) -> String {
    let list = |terms: &[SkillTerm]| -> String {
        if terms.is_empty() {
            "(none)".to_string()
        } else {
            terms
                .iter()
                .map(|t| t.canonical.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    };
    let breakdown = format!(
        "matching: {}\nskills_to_advance: {}\nmissing: {}",
        list(&buckets.matching),
        list(&buckets.to_advance),
        list(&buckets.missing),
    );
    let requirements = if job.requirements.is_empty() {
        "(none listed)".to_string()
    } else {
        job.requirements.join("; ")
    };

    ANALYSIS_PROMPT_TEMPLATE
        .replace("{job_title}", &job.title)
        .replace("{job_description}", &job.description)
        .replace("{job_requirements}", &requirements)
        .replace("{skill_breakdown}", &breakdown)
        .replace("{resume_text}", &candidate.resume_text)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
