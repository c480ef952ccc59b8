// Prompt constants and builders for the conversation module.

use crate::analysis::GapAnalysis;
use crate::conversation::{ConversationTurn, TurnRole};

/// System prompt for follow-up questions about a completed analysis.
pub const CHAT_SYSTEM: &str =
    "You are a helpful career coach answering follow-up questions about a \
    resume-to-job gap analysis the candidate has already received. \
    Ground every answer in the analysis context provided. \
    Be concrete and encouraging; keep answers under 200 words. \
    If a question is unrelated to careers, jobs, or skills, say so briefly.";

/// Builds the chat prompt: anchoring analysis context, the bounded window
/// of recent turns, then the new question.
pub fn build_chat_prompt(
    analysis: &GapAnalysis,
    job_title: &str,
    recent_turns: &[ConversationTurn],
    question: &str,
) -> String {
    let skills = |terms: &[crate::skills::SkillTerm]| -> String {
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

    let score = analysis
        .overall_score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "not applicable".to_string());

    let mut prompt = format!(
        "ANALYSIS CONTEXT\n\
         Job: {job_title}\n\
         Overall score: {score}\n\
         Matching skills: {}\n\
         Skills to advance: {}\n\
         Missing skills: {}\n\
         Summary: {}\n",
        skills(&analysis.matching_skills),
        skills(&analysis.skills_to_advance),
        skills(&analysis.missing_skills),
        analysis.summary,
    );

    if !recent_turns.is_empty() {
        prompt.push_str("\nRECENT CONVERSATION\n");
        for turn in recent_turns {
            let role = match turn.role {
                TurnRole::User => "User",
                TurnRole::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{role}: {}\n", turn.content));
        }
    }

    prompt.push_str(&format!("\nNEW QUESTION\n{question}"));
    prompt
}
