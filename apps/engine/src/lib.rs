//! Resume-to-job gap analysis and learning-plan engine.
//!
//! Given already-extracted resume text and a job posting, the engine
//! computes a structured skill gap (`AnalysisEngine`), answers follow-up
//! questions about it (`ConversationSession`), and turns it into a dated
//! weekly curriculum (`PlanGenerator`). LLM calls go through a fallback
//! chain of interchangeable providers; every result degrades gracefully to
//! a deterministic path when providers are unavailable.
//!
//! The crate performs no file I/O and defines no network protocol of its
//! own; the consuming application owns persistence, auth, and delivery.

pub mod analysis;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod plan;
pub mod provider;
pub mod skills;

pub use analysis::{
    AnalysisEngine, AnalysisError, AnalysisSource, CandidateProfile, GapAnalysis, JobPosting,
    MatchLevel,
};
pub use config::{EngineConfig, ProviderKind, ProviderSettings};
pub use conversation::{
    AskOutcome, ConversationSession, ConversationTurn, SessionError, SessionState, TurnRole,
};
pub use errors::EngineError;
pub use plan::{LearningPlan, PlanError, PlanGenerator, Priority, Topic, WeekPlan};
pub use provider::{
    AttemptOutcome, CancelToken, ChainError, ChainOutcome, CompletionRequest, ProviderAttempt,
    ProviderChain, ProviderClient, ProviderError, RetryPolicy,
};
pub use skills::{MatcherConfig, SkillBuckets, SkillMatcher, SkillNormalizer, SkillTerm};
