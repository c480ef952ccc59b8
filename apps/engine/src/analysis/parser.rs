//! Strict decoder for the LLM analysis response.
//!
//! Total function: the output is a tagged variant, never an error. The
//! decision of what to do with unparseable output belongs to the engine
//! (deterministic fallback), not to exception handling here.

use serde::Deserialize;

/// Successfully decoded LLM analysis payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmAnalysis {
    pub overall_score: u8,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub matching_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub skills_to_advance: Vec<String>,
}

/// Decode result: either the structured payload or the raw text for the
/// fallback path.
#[derive(Debug)]
pub enum ParsedAnalysis {
    Parsed(LlmAnalysis),
    Unparseable(String),
}

/// Decodes LLM output into `ParsedAnalysis`. Tolerates markdown fences and
/// prose around the JSON object; never panics, never errors.
pub fn parse_analysis(text: &str) -> ParsedAnalysis {
    let stripped = strip_json_fences(text);

    if let Ok(parsed) = serde_json::from_str::<LlmAnalysis>(stripped) {
        return ParsedAnalysis::Parsed(parsed);
    }

    // Models sometimes wrap the object in prose; take the outermost braces.
    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<LlmAnalysis>(&stripped[start..=end]) {
                return ParsedAnalysis::Parsed(parsed);
            }
        }
    }

    ParsedAnalysis::Unparseable(text.to_string())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    for prefix in ["```json", "```"] {
        if let Some(stripped) = text.strip_prefix(prefix) {
            return stripped
                .trim_start()
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or_else(|| stripped.trim_start());
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "overall_score": 72,
        "strengths": ["Backend JS"],
        "matching_skills": ["javascript"],
        "skills_to_advance": ["express.js"],
        "missing_skills": ["docker"],
        "summary": "Solid backend fit with a containerization gap."
    }"#;

    #[test]
    fn test_parses_clean_json() {
        match parse_analysis(VALID) {
            ParsedAnalysis::Parsed(a) => {
                assert_eq!(a.overall_score, 72);
                assert_eq!(a.missing_skills, vec!["docker"]);
            }
            ParsedAnalysis::Unparseable(_) => panic!("should parse"),
        }
    }

    #[test]
    fn test_parses_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(matches!(parse_analysis(&fenced), ParsedAnalysis::Parsed(_)));
    }

    #[test]
    fn test_parses_json_wrapped_in_prose() {
        let wrapped = format!("Here is the analysis you asked for:\n{VALID}\nHope that helps!");
        assert!(matches!(parse_analysis(&wrapped), ParsedAnalysis::Parsed(_)));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let minimal = r#"{"overall_score": 50, "summary": "ok"}"#;
        match parse_analysis(minimal) {
            ParsedAnalysis::Parsed(a) => assert!(a.matching_skills.is_empty()),
            ParsedAnalysis::Unparseable(_) => panic!("should parse"),
        }
    }

    #[test]
    fn test_free_text_is_unparseable_not_error() {
        let raw = "I think the candidate is a good fit overall.";
        match parse_analysis(raw) {
            ParsedAnalysis::Unparseable(text) => assert_eq!(text, raw),
            ParsedAnalysis::Parsed(_) => panic!("should not parse"),
        }
    }

    #[test]
    fn test_missing_required_field_is_unparseable() {
        let no_summary = r#"{"overall_score": 50}"#;
        assert!(matches!(
            parse_analysis(no_summary),
            ParsedAnalysis::Unparseable(_)
        ));
    }
}
