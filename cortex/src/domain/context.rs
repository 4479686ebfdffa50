// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::module::ModuleId;

/// Most recently pushed context. Replaced wholesale on every push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,
}

impl ContextState {
    pub fn new(domain: Option<String>, keywords: Option<Vec<String>>, intent: Option<String>) -> Self {
        Self {
            domain,
            keywords: keywords.map(normalize_keywords),
            intent,
            pushed_at: Some(Utc::now()),
        }
    }

    pub fn keywords(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or(&[])
    }
}

/// Lower-case, trim and de-duplicate while keeping first-occurrence order
fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !seen.contains(&keyword) {
            seen.push(keyword);
        }
    }
    seen
}

/// Domain labels produced by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextDomain {
    Programming,
    Creative,
    Learning,
    General,
}

impl ContextDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Programming => "programming",
            Self::Creative => "creative",
            Self::Learning => "learning",
            Self::General => "general",
        }
    }
}

/// Intent labels produced by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Debugging,
    Creation,
    Explanation,
    Assistance,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debugging => "debugging",
            Self::Creation => "creation",
            Self::Explanation => "explanation",
            Self::Assistance => "assistance",
            Self::General => "general",
        }
    }
}

/// Result of analyzing a piece of free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAnalysis {
    pub keywords: Vec<String>,
    pub domain: ContextDomain,
    pub intent: Intent,
    pub confidence: f64,
    pub suggested_modules: Vec<ModuleId>,
}
