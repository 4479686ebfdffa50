// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Context analyzer
//!
//! Lightweight heuristics only: keyword extraction, fixed-precedence domain and
//! intent rules, and module suggestions combining manifest triggers with the
//! learned association table. Pure with respect to its inputs; it never
//! mutates the registry.

use crate::domain::association::AssociationTable;
use crate::domain::context::{ContextAnalysis, ContextDomain, Intent};
use crate::domain::module::ModuleId;

use super::registry::ModuleRegistry;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "can", "this", "that",
    "these", "those", "it", "its", "my", "me", "you", "your", "our", "we", "they", "them",
    "not", "all", "any", "some", "into", "about", "please", "just", "get",
];

/// Evaluated top to bottom; first match wins
const DOMAIN_RULES: &[(ContextDomain, &[&str])] = &[
    (
        ContextDomain::Programming,
        &[
            "python", "javascript", "typescript", "rust", "code", "debug", "script", "programming",
            "function", "compile", "bug",
        ],
    ),
    (ContextDomain::Creative, &["write", "story", "poem", "creative", "novel", "fiction"]),
    (ContextDomain::Learning, &["teach", "learn", "tutorial", "lesson", "study"]),
];

/// Evaluated top to bottom; first match wins
const INTENT_RULES: &[(Intent, &[&str])] = &[
    (Intent::Debugging, &["debug", "fix", "error", "bug", "broken"]),
    (Intent::Creation, &["create", "build", "make", "generate"]),
    (Intent::Explanation, &["explain", "what", "why", "how"]),
    (Intent::Assistance, &["help"]),
];

const RULE_SCORE: f64 = 1.0;

/// Lower-case, split on whitespace, trim edge punctuation, drop stopwords and
/// tokens of two characters or fewer. First-occurrence order, no duplicates.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in text.to_lowercase().split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.chars().count() <= 2 || STOPWORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

pub fn detect_domain(text: &str) -> ContextDomain {
    let text = text.to_lowercase();
    DOMAIN_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| text.contains(n)))
        .map(|(domain, _)| *domain)
        .unwrap_or(ContextDomain::General)
}

pub fn detect_intent(text: &str) -> Intent {
    let text = text.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| text.contains(n)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::General)
}

#[derive(Debug, Clone)]
pub struct ContextAnalyzer {
    min_suggestion_weight: f64,
}

impl ContextAnalyzer {
    pub fn new(min_suggestion_weight: f64) -> Self {
        Self {
            min_suggestion_weight,
        }
    }

    pub fn min_suggestion_weight(&self) -> f64 {
        self.min_suggestion_weight
    }

    pub fn analyze(
        &self,
        text: &str,
        registry: &ModuleRegistry,
        associations: &AssociationTable,
    ) -> ContextAnalysis {
        let keywords = extract_keywords(text);
        let domain = detect_domain(text);
        let intent = detect_intent(text);
        let suggested_modules = self.suggest(text, &keywords, registry, associations);
        let confidence = confidence(domain, intent, &keywords, &suggested_modules);

        ContextAnalysis {
            keywords,
            domain,
            intent,
            confidence,
            suggested_modules,
        }
    }

    pub fn suggest_modules(
        &self,
        text: &str,
        registry: &ModuleRegistry,
        associations: &AssociationTable,
    ) -> Vec<ModuleId> {
        self.suggest(text, &extract_keywords(text), registry, associations)
    }

    /// Each module scores 1.0 if one of its triggers appears in the text, plus
    /// its strongest learned weight across the keywords (if above threshold).
    /// Sorted by descending score; ties keep catalog order.
    fn suggest(
        &self,
        text: &str,
        keywords: &[String],
        registry: &ModuleRegistry,
        associations: &AssociationTable,
    ) -> Vec<ModuleId> {
        let text = text.to_lowercase();

        let mut scored: Vec<(ModuleId, f64)> = registry
            .iter()
            .filter_map(|module| {
                let rule = if module.triggers.iter().any(|t| !t.is_empty() && text.contains(t.as_str())) {
                    RULE_SCORE
                } else {
                    0.0
                };
                let learned = keywords
                    .iter()
                    .map(|k| associations.weight(k, &module.id))
                    .filter(|w| *w > 0.0 && *w >= self.min_suggestion_weight)
                    .fold(0.0, f64::max);

                let score = rule + learned;
                (score > 0.0).then(|| (module.id.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().map(|(id, _)| id).collect()
    }
}

fn confidence(
    domain: ContextDomain,
    intent: Intent,
    keywords: &[String],
    suggestions: &[ModuleId],
) -> f64 {
    let mut confidence = 0.4;
    if domain != ContextDomain::General {
        confidence += 0.15;
    }
    if intent != Intent::General {
        confidence += 0.15;
    }
    if !suggestions.is_empty() {
        confidence += 0.1;
    }
    if !keywords.is_empty() {
        confidence += 0.1;
    }
    f64::clamp(confidence, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::builtin_modules;

    fn registry() -> ModuleRegistry {
        ModuleRegistry::from_manifests(builtin_modules()).unwrap()
    }

    #[test]
    fn test_extract_keywords() {
        let keywords = extract_keywords("Debug my Python script, please! The script is broken.");
        assert_eq!(keywords, vec!["debug", "python", "script", "broken"]);
    }

    #[test]
    fn test_extract_keywords_empty() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("a an to of ...").is_empty());
    }

    #[test]
    fn test_detect_domain_precedence() {
        assert_eq!(detect_domain("write a python story"), ContextDomain::Programming);
        assert_eq!(detect_domain("Write me a poem"), ContextDomain::Creative);
        assert_eq!(detect_domain("I want to learn French"), ContextDomain::Learning);
        assert_eq!(detect_domain("hello there"), ContextDomain::General);
    }

    #[test]
    fn test_detect_intent_precedence() {
        assert_eq!(detect_intent("fix and explain this"), Intent::Debugging);
        assert_eq!(detect_intent("build a website"), Intent::Creation);
        assert_eq!(detect_intent("why is the sky blue"), Intent::Explanation);
        assert_eq!(detect_intent("help me out"), Intent::Assistance);
        assert_eq!(detect_intent("good morning"), Intent::General);
    }

    #[test]
    fn test_analyze_debug_python_script() {
        let analyzer = ContextAnalyzer::new(0.25);
        let analysis = analyzer.analyze("debug my python script", &registry(), &AssociationTable::new());

        assert!(analysis.keywords.contains(&"debug".to_string()));
        assert!(analysis.keywords.contains(&"python".to_string()));
        assert!(!analysis.keywords.contains(&"my".to_string()));
        assert_eq!(analysis.domain, ContextDomain::Programming);
        assert_eq!(analysis.intent, Intent::Debugging);
        assert_eq!(
            analysis.suggested_modules,
            vec![ModuleId::from("python_expertise"), ModuleId::from("debugging_tools")]
        );
        assert!((analysis.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_bounds() {
        let analyzer = ContextAnalyzer::new(0.25);
        let analysis = analyzer.analyze("", &registry(), &AssociationTable::new());
        assert_eq!(analysis.domain, ContextDomain::General);
        assert!(analysis.suggested_modules.is_empty());
        assert!((0.0..=1.0).contains(&analysis.confidence));
        assert!((analysis.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_learned_associations_rank_suggestions() {
        let analyzer = ContextAnalyzer::new(0.25);
        let mut table = AssociationTable::new();
        table.reinforce("python", &ModuleId::from("testing_frameworks"), 0.5);
        table.reinforce("python", &ModuleId::from("html_css"), 0.1);

        let suggestions = analyzer.suggest_modules("python unit checks", &registry(), &table);

        // rule + learned outranks rule alone; below-threshold learning is ignored
        assert_eq!(
            suggestions,
            vec![ModuleId::from("python_expertise"), ModuleId::from("testing_frameworks")]
        );

        table.reinforce("python", &ModuleId::from("python_expertise"), 0.3);
        table.reinforce("python", &ModuleId::from("testing_frameworks"), 0.5);
        let suggestions = analyzer.suggest_modules("python", &registry(), &table);
        assert_eq!(suggestions[0], ModuleId::from("python_expertise"));
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let analyzer = ContextAnalyzer::new(0.25);
        let registry = registry();
        let table = AssociationTable::new();
        let text = "Help me write a web story about html and css";

        let first = analyzer.analyze(text, &registry, &table);
        for _ in 0..5 {
            assert_eq!(analyzer.analyze(text, &registry, &table), first);
        }
    }
}
