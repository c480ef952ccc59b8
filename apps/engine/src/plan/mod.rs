//! Plan Generator: turns a gap analysis into a dated week-by-week
//! curriculum.
//!
//! No LLM calls and no I/O: the plan is a pure function of the analysis,
//! the requested duration, and the start date. Missing skills become
//! Critical topics and land in the earliest weeks; skills to advance are
//! Important; Nice-to-have topics drift toward the end. A fully matching
//! candidate still gets a depth/portfolio plan rather than an empty one.

use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::analysis::GapAnalysis;
use crate::skills::SkillTerm;

pub const DEFAULT_DURATION_WEEKS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    Important,
    NiceToHave,
}

/// One unit of study within a week.
#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub name: String,
    pub related_skill: Option<SkillTerm>,
    pub priority: Priority,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekPlan {
    pub index: u32,
    pub starts_on: NaiveDate,
    pub focus: String,
    pub topics: Vec<Topic>,
}

/// A complete curriculum. Immutable once built; regeneration produces a
/// fresh plan rather than mutating this one.
#[derive(Debug, Clone, Serialize)]
pub struct LearningPlan {
    pub duration_weeks: u32,
    pub starts_on: NaiveDate,
    pub weeks: Vec<WeekPlan>,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan duration must be at least one week, got {0}")]
    InvalidDuration(u32),
}

pub struct PlanGenerator {
    cached: Mutex<Option<Arc<LearningPlan>>>,
}

impl Default for PlanGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanGenerator {
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    /// Generates a plan starting today. With `force_regenerate` false, a
    /// cached plan of the same duration is returned as-is; with it true the
    /// plan is rebuilt and the cache replaced atomically, so callers never
    /// observe a partially written plan.
    pub fn generate(
        &self,
        analysis: &GapAnalysis,
        duration_weeks: u32,
        force_regenerate: bool,
    ) -> Result<Arc<LearningPlan>, PlanError> {
        self.generate_from(
            analysis,
            duration_weeks,
            force_regenerate,
            Utc::now().date_naive(),
        )
    }

    /// Same as `generate` with an explicit start date.
    pub fn generate_from(
        &self,
        analysis: &GapAnalysis,
        duration_weeks: u32,
        force_regenerate: bool,
        starts_on: NaiveDate,
    ) -> Result<Arc<LearningPlan>, PlanError> {
        if duration_weeks == 0 {
            return Err(PlanError::InvalidDuration(duration_weeks));
        }

        if !force_regenerate {
            let cached = self.cached.lock().unwrap();
            if let Some(plan) = cached.as_ref() {
                if plan.duration_weeks == duration_weeks {
                    return Ok(Arc::clone(plan));
                }
            }
        }

        let plan = Arc::new(build_plan(analysis, duration_weeks, starts_on));
        info!(
            weeks = duration_weeks,
            topics = plan.weeks.iter().map(|w| w.topics.len()).sum::<usize>(),
            "learning plan generated"
        );
        *self.cached.lock().unwrap() = Some(Arc::clone(&plan));
        Ok(plan)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Plan construction
// ────────────────────────────────────────────────────────────────────────────

fn build_plan(analysis: &GapAnalysis, duration_weeks: u32, starts_on: NaiveDate) -> LearningPlan {
    let topics = collect_topics(analysis);

    // distribute in priority order; Critical fills the earliest weeks,
    // Nice-to-have breaks load ties toward the latest
    let mut week_topics: Vec<Vec<Topic>> = vec![Vec::new(); duration_weeks as usize];
    for topic in topics {
        let week = pick_week(&week_topics, topic.priority);
        week_topics[week].push(topic);
    }

    let weeks = week_topics
        .into_iter()
        .enumerate()
        .map(|(i, topics)| WeekPlan {
            index: i as u32 + 1,
            starts_on: starts_on
                .checked_add_days(Days::new(7 * i as u64))
                .unwrap_or(starts_on),
            focus: week_focus(&topics),
            topics,
        })
        .collect();

    LearningPlan {
        duration_weeks,
        starts_on,
        weeks,
    }
}

/// Builds the topic list, priority-ordered: missing skills first, then
/// skills to advance, then depth/portfolio topics when there are no gaps.
fn collect_topics(analysis: &GapAnalysis) -> Vec<Topic> {
    let mut topics = Vec::new();

    for term in &analysis.missing_skills {
        topics.push(Topic {
            name: format!("Learn {} fundamentals", term.canonical),
            resources: suggest_resources(&term.canonical, Priority::Critical),
            related_skill: Some(term.clone()),
            priority: Priority::Critical,
        });
    }
    for term in &analysis.skills_to_advance {
        topics.push(Topic {
            name: format!("Deepen {} beyond basics", term.canonical),
            resources: suggest_resources(&term.canonical, Priority::Important),
            related_skill: Some(term.clone()),
            priority: Priority::Important,
        });
    }

    if topics.is_empty() {
        // fully matching candidate: depth and portfolio work instead of an
        // empty plan
        for term in analysis.matching_skills.iter().take(4) {
            topics.push(Topic {
                name: format!("Advanced {} patterns and internals", term.canonical),
                resources: suggest_resources(&term.canonical, Priority::Important),
                related_skill: Some(term.clone()),
                priority: Priority::Important,
            });
        }
        topics.push(Topic {
            name: "Build a portfolio project showcasing your strongest skills".to_string(),
            related_skill: None,
            priority: Priority::NiceToHave,
            resources: vec![
                "Pick a real problem and ship a small end-to-end project".to_string(),
                "Write a short case study of the result".to_string(),
            ],
        });
        topics.push(Topic {
            name: "Interview preparation and system design practice".to_string(),
            related_skill: None,
            priority: Priority::NiceToHave,
            resources: vec!["Mock interviews with a peer".to_string()],
        });
    }

    topics.sort_by_key(|t| t.priority);
    topics
}

/// Least-loaded week wins. Critical and Important break ties toward the
/// earliest week, Nice-to-have toward the latest, which front-loads gaps
/// and drifts polish to the end of the plan.
fn pick_week(week_topics: &[Vec<Topic>], priority: Priority) -> usize {
    let min_load = week_topics.iter().map(Vec::len).min().unwrap_or(0);
    let candidates = week_topics
        .iter()
        .enumerate()
        .filter(|(_, topics)| topics.len() == min_load)
        .map(|(i, _)| i);
    match priority {
        Priority::NiceToHave => candidates.last().unwrap_or(0),
        _ => week_topics
            .iter()
            .position(|topics| topics.len() == min_load)
            .unwrap_or(0),
    }
}

fn week_focus(topics: &[Topic]) -> String {
    let Some(dominant) = topics.iter().map(|t| t.priority).min() else {
        return "Consolidation and review".to_string();
    };
    let names: Vec<&str> = topics
        .iter()
        .filter(|t| t.priority == dominant)
        .take(2)
        .map(|t| t.related_skill.as_ref().map(|s| s.canonical.as_str()).unwrap_or("portfolio"))
        .collect();
    match dominant {
        Priority::Critical => format!("Close critical gaps: {}", names.join(", ")),
        Priority::Important => format!("Strengthen: {}", names.join(", ")),
        Priority::NiceToHave => "Polish, portfolio, and exploration".to_string(),
    }
}

fn suggest_resources(skill: &str, priority: Priority) -> Vec<String> {
    let mut resources = vec![
        format!("Official {skill} documentation and getting-started guide"),
        format!("A guided course or tutorial series on {skill}"),
    ];
    if priority == Priority::Critical {
        resources.push(format!("Hands-on mini-project applying {skill}"));
    }
    resources
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
