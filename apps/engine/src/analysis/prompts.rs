// All LLM prompt constants for the analysis module. The conversation module
// keeps its own prompts.rs alongside it.

/// System prompt for gap analysis. Enforces JSON-only output.
pub const ANALYSIS_SYSTEM: &str =
    "You are an expert career coach and technical recruiter analyzing how well \
    a candidate's resume matches a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Gap analysis prompt template.
/// Replace: {job_title}, {job_description}, {job_requirements},
///          {resume_text}, {skill_breakdown}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze how well this candidate matches the job below.

A deterministic keyword pass has already bucketed the job's required skills.
Confirm or adjust those buckets based on the full resume, then add an overall
score, the candidate's strongest points for THIS job, and a short narrative
summary.

Return a JSON object with this EXACT schema (no extra fields):
{
  "overall_score": 72,
  "strengths": ["Strong backend JavaScript experience", "Has shipped REST APIs"],
  "matching_skills": ["javascript", "node.js"],
  "skills_to_advance": ["express.js"],
  "missing_skills": ["docker"],
  "summary": "Two to four sentences on overall fit, biggest gaps, and how to close them."
}

Rules:
- overall_score is an integer 0-100.
- Every skill from the deterministic breakdown must appear in exactly one of
  matching_skills, skills_to_advance, or missing_skills. Use the canonical
  lowercase names given in the breakdown.
- skills_to_advance means the candidate has touched the skill but does not
  demonstrate proficiency.
- Do NOT invent skills that are neither in the breakdown nor in the job text.

JOB TITLE:
{job_title}

JOB DESCRIPTION:
{job_description}

JOB REQUIREMENTS:
{job_requirements}

DETERMINISTIC SKILL BREAKDOWN:
{skill_breakdown}

CANDIDATE RESUME:
{resume_text}"#;
