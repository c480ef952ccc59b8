//! Skill extraction layer: normalization and gap bucketing.
//!
//! Everything here is pure and synchronous. The matcher runs before any LLM
//! call so a usable skill breakdown exists even when every provider is down.

pub mod matcher;
pub mod normalizer;

pub use matcher::{MatcherConfig, SkillBuckets, SkillMatcher};
pub use normalizer::{SkillNormalizer, SkillTerm};
