//! Skill Normalizer: canonicalizes raw skill and requirement strings.
//!
//! Total over its input domain: unknown terms canonicalize to their folded
//! form, empty input stays empty. Canonical forms are fixed points, so
//! `normalize` is idempotent.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Built-in alias table (many-to-one). Treated as data, not logic: callers
/// can extend it via `SkillNormalizer::with_aliases`.
const ALIAS_TABLE: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("react.js", "react"),
    ("reactjs", "react"),
    ("node", "node.js"),
    ("nodejs", "node.js"),
    ("express", "express.js"),
    ("expressjs", "express.js"),
    ("vue", "vue.js"),
    ("vuejs", "vue.js"),
    ("angularjs", "angular"),
    ("angular.js", "angular"),
    ("k8s", "kubernetes"),
    ("postgres", "postgresql"),
    ("psql", "postgresql"),
    ("mongo", "mongodb"),
    ("golang", "go"),
    ("py", "python"),
    ("python3", "python"),
    ("html5", "html"),
    ("css3", "css"),
    ("ci/cd", "ci-cd"),
    ("gcp", "google cloud"),
    ("ml", "machine learning"),
];

/// A skill term in comparable form.
///
/// `canonical` is the normalization result used for equality; `aliases` are
/// the other surface forms known to map to the same canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTerm {
    pub raw: String,
    pub canonical: String,
    pub aliases: BTreeSet<String>,
}

/// Canonicalizes skill strings against an alias table.
#[derive(Debug, Clone)]
pub struct SkillNormalizer {
    aliases: HashMap<String, String>,
    // canonical -> every alias that maps to it, for SkillTerm::aliases
    reverse: HashMap<String, BTreeSet<String>>,
}

impl Default for SkillNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillNormalizer {
    pub fn new() -> Self {
        Self::from_pairs(ALIAS_TABLE.iter().map(|(a, c)| (a.to_string(), c.to_string())))
    }

    /// Builds a normalizer with the built-in table plus caller-supplied
    /// `(alias, canonical)` pairs. Caller pairs win on conflict.
    pub fn with_aliases<I>(extra: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self::from_pairs(
            ALIAS_TABLE
                .iter()
                .map(|(a, c)| (a.to_string(), c.to_string()))
                .chain(extra),
        )
    }

    fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut aliases = HashMap::new();
        let mut reverse: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (alias, canonical) in pairs {
            let alias = fold(&alias);
            let canonical = fold(&canonical);
            if alias.is_empty() || canonical.is_empty() {
                continue;
            }
            reverse.entry(canonical.clone()).or_default().insert(alias.clone());
            aliases.insert(alias, canonical);
        }
        Self { aliases, reverse }
    }

    /// Canonicalizes a raw skill string. Never fails.
    pub fn normalize(&self, raw: &str) -> SkillTerm {
        let folded = strip_version_suffix(&fold(raw));
        let canonical = self
            .aliases
            .get(&folded)
            .cloned()
            .unwrap_or_else(|| folded.clone());

        let mut aliases = self.reverse.get(&canonical).cloned().unwrap_or_default();
        if folded != canonical {
            aliases.insert(folded);
        }
        aliases.remove(&canonical);

        SkillTerm {
            raw: raw.trim().to_string(),
            canonical,
            aliases,
        }
    }

    /// All surface forms of a term worth searching prose for: the canonical
    /// plus every known alias.
    pub fn surface_forms(&self, term: &SkillTerm) -> Vec<String> {
        let mut forms = vec![term.canonical.clone()];
        forms.extend(term.aliases.iter().cloned());
        forms
    }
}

/// Lowercases, trims, and collapses internal whitespace.
fn fold(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops trailing version tokens: "node.js 18" -> "node.js", "java 1.8" ->
/// "java", "terraform v1.5" -> "terraform". Leaves glued digits alone
/// ("html5" is the alias table's problem, not a version).
fn strip_version_suffix(folded: &str) -> String {
    let mut tokens: Vec<&str> = folded.split(' ').collect();
    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1];
        if is_version_token(last) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

fn is_version_token(token: &str) -> bool {
    let digits = token.strip_prefix('v').unwrap_or(token);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_trims() {
        let n = SkillNormalizer::new();
        assert_eq!(n.normalize("  Docker  ").canonical, "docker");
    }

    #[test]
    fn test_alias_resolution_react_family() {
        let n = SkillNormalizer::new();
        assert_eq!(n.normalize("React.js").canonical, "react");
        assert_eq!(n.normalize("ReactJS").canonical, "react");
        assert_eq!(n.normalize("React").canonical, "react");
    }

    #[test]
    fn test_version_suffix_stripped() {
        let n = SkillNormalizer::new();
        assert_eq!(n.normalize("Node.js 18").canonical, "node.js");
        assert_eq!(n.normalize("Java 1.8").canonical, "java");
        assert_eq!(n.normalize("Terraform v1.5").canonical, "terraform");
    }

    #[test]
    fn test_cpp_and_csharp_stay_distinct() {
        let n = SkillNormalizer::new();
        assert_ne!(n.normalize("C++").canonical, n.normalize("C#").canonical);
    }

    #[test]
    fn test_unknown_term_folds_to_lowercase() {
        let n = SkillNormalizer::new();
        assert_eq!(n.normalize("Some Obscure Tool").canonical, "some obscure tool");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let n = SkillNormalizer::new();
        for raw in ["React.js", "Node.js 18", "JS", "C++", "k8s", "Rust"] {
            let once = n.normalize(raw);
            let twice = n.normalize(&once.canonical);
            assert_eq!(once.canonical, twice.canonical, "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_empty_input_is_empty_canonical() {
        let n = SkillNormalizer::new();
        assert_eq!(n.normalize("   ").canonical, "");
    }

    #[test]
    fn test_caller_aliases_extend_table() {
        let n = SkillNormalizer::with_aliases(vec![(
            "rx".to_string(),
            "reactive extensions".to_string(),
        )]);
        assert_eq!(n.normalize("Rx").canonical, "reactive extensions");
    }

    #[test]
    fn test_aliases_attached_to_term() {
        let n = SkillNormalizer::new();
        let term = n.normalize("JavaScript");
        assert!(term.aliases.contains("js"));
        assert!(!term.aliases.contains("javascript"));
    }
}
