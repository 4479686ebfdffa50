// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tool dispatch
//!
//! Turns `{ name, arguments }` calls into service operations and renders the
//! outcome as text. Core errors become `is_error` responses; nothing here
//! terminates the process.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::{CortexService, InteractionRecord};
use crate::domain::module::{ModuleId, ModuleType, Priority, StatusFilter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,

    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub text: String,

    #[serde(default)]
    pub is_error: bool,
}

impl ToolResponse {
    fn ok(text: String) -> Self {
        Self { text, is_error: false }
    }

    fn error(text: String) -> Self {
        Self { text, is_error: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "load_module",
        description: "Load a cognitive module into active memory",
    },
    ToolDescriptor {
        name: "unload_module",
        description: "Unload a module from active memory",
    },
    ToolDescriptor {
        name: "list_modules",
        description: "List available or loaded modules",
    },
    ToolDescriptor {
        name: "add_dependency",
        description: "Record that one loaded module depends on another",
    },
    ToolDescriptor {
        name: "push_context",
        description: "Update the current context for better module selection",
    },
    ToolDescriptor {
        name: "analyze_context",
        description: "Analyze input to determine relevant modules",
    },
    ToolDescriptor {
        name: "load_identity",
        description: "Load a specific identity configuration",
    },
    ToolDescriptor {
        name: "apply_persona",
        description: "Apply a persona overlay to current identity",
    },
    ToolDescriptor {
        name: "get_memory_usage",
        description: "Get current memory usage statistics",
    },
    ToolDescriptor {
        name: "optimize_memory",
        description: "Trigger memory optimization",
    },
    ToolDescriptor {
        name: "provide_feedback",
        description: "Provide feedback on module effectiveness",
    },
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoadModuleArgs {
    module_id: String,
    #[serde(default)]
    priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnloadModuleArgs {
    module_id: String,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListModulesArgs {
    #[serde(default)]
    filter: StatusFilter,
    #[serde(default, rename = "type")]
    module_type: Option<ModuleType>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddDependencyArgs {
    dependent: String,
    depends_on: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PushContextArgs {
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    intent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnalyzeContextArgs {
    input: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoadIdentityArgs {
    identity_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApplyPersonaArgs {
    persona_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyArgs {}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptimizeMemoryArgs {
    #[serde(default)]
    target_free: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProvideFeedbackArgs {
    interaction_id: String,
    success: bool,
    #[serde(default)]
    modules_helpful: Option<Vec<String>>,
}

/// Missing or null arguments parse as an empty object
fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: &Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(arguments).with_context(|| format!("Invalid arguments for {tool}"))
}

/// Thousands separators, e.g. 100000 -> "100,000"
pub fn format_tokens(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Clone)]
pub struct ToolDispatcher {
    cortex: Arc<CortexService>,
}

impl ToolDispatcher {
    pub fn new(cortex: Arc<CortexService>) -> Self {
        Self { cortex }
    }

    pub fn list_tools(&self) -> &'static [ToolDescriptor] {
        TOOLS
    }

    pub fn dispatch(&self, call: &ToolCall) -> ToolResponse {
        debug!(tool = %call.name, "Dispatching tool call");
        match self.handle(call) {
            Ok(text) => ToolResponse::ok(text),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResponse::error(format!("Error: {e:#}"))
            }
        }
    }

    fn handle(&self, call: &ToolCall) -> Result<String> {
        let args = &call.arguments;
        match call.name.as_str() {
            "load_module" => {
                let a: LoadModuleArgs = parse_args(&call.name, args)?;
                let report = self.cortex.load_module(&ModuleId::new(a.module_id.clone()), a.priority)?;

                let mut text = if report.already_loaded {
                    format!("Module already loaded: {}", a.module_id)
                } else {
                    format!("Successfully loaded module: {}", a.module_id)
                };
                let dependencies: Vec<&str> = report
                    .loaded
                    .iter()
                    .filter(|id| id.as_str() != a.module_id)
                    .map(|id| id.as_str())
                    .collect();
                if !dependencies.is_empty() {
                    text.push_str(&format!("\nDependencies loaded: {}", dependencies.join(", ")));
                }
                if !report.evicted.is_empty() {
                    text.push_str(&format!("\nEvicted: {}", join(&report.evicted)));
                }
                Ok(text)
            }
            "unload_module" => {
                let a: UnloadModuleArgs = parse_args(&call.name, args)?;
                let report = self.cortex.unload_module(&ModuleId::new(a.module_id.clone()), a.force)?;

                let mut text = format!("Successfully unloaded module: {}", a.module_id);
                if !report.dropped_edges.is_empty() {
                    text.push_str(&format!(
                        "\nDropped {} dependency edge(s)",
                        report.dropped_edges.len()
                    ));
                }
                Ok(text)
            }
            "list_modules" => {
                let a: ListModulesArgs = parse_args(&call.name, args)?;
                let modules = self.cortex.list_modules(a.filter, a.module_type);

                let lines: Vec<String> = modules
                    .iter()
                    .map(|m| {
                        format!(
                            "- {} ({}): {} [{}]",
                            m.id,
                            m.module_type.as_str(),
                            m.description,
                            m.status.as_str()
                        )
                    })
                    .collect();
                Ok(format!("Found {} modules:\n{}", modules.len(), lines.join("\n")))
            }
            "add_dependency" => {
                let a: AddDependencyArgs = parse_args(&call.name, args)?;
                let added = self
                    .cortex
                    .add_dependency(&ModuleId::new(a.dependent.clone()), &ModuleId::new(a.depends_on.clone()))?;
                Ok(if added {
                    format!("Dependency recorded: {} depends on {}", a.dependent, a.depends_on)
                } else {
                    format!("Dependency already recorded: {} depends on {}", a.dependent, a.depends_on)
                })
            }
            "push_context" => {
                let a: PushContextArgs = parse_args(&call.name, args)?;
                let context = self.cortex.push_context(a.domain, a.keywords, a.intent);

                let mut parts = Vec::new();
                if let Some(domain) = &context.domain {
                    parts.push(format!("domain: {domain}"));
                }
                if let Some(keywords) = &context.keywords {
                    parts.push(format!("keywords: {}", keywords.join(", ")));
                }
                if let Some(intent) = &context.intent {
                    parts.push(format!("intent: {intent}"));
                }
                Ok(format!("Context updated: {}", parts.join(", ")))
            }
            "analyze_context" => {
                let a: AnalyzeContextArgs = parse_args(&call.name, args)?;
                let analysis = self.cortex.analyze_context(&a.input);
                Ok(format!(
                    "Context Analysis:\n- Keywords: {}\n- Domain: {}\n- Intent: {}\n- Confidence: {:.1}%\n- Suggested modules: {}",
                    analysis.keywords.join(", "),
                    analysis.domain.as_str(),
                    analysis.intent.as_str(),
                    analysis.confidence * 100.0,
                    join(&analysis.suggested_modules)
                ))
            }
            "load_identity" => {
                let a: LoadIdentityArgs = parse_args(&call.name, args)?;
                self.cortex.load_identity(&a.identity_id)?;
                Ok(format!("Successfully loaded identity: {}", a.identity_id))
            }
            "apply_persona" => {
                let a: ApplyPersonaArgs = parse_args(&call.name, args)?;
                self.cortex.apply_persona(&a.persona_id)?;
                Ok(format!("Successfully applied persona: {}", a.persona_id))
            }
            "get_memory_usage" => {
                let _: EmptyArgs = parse_args(&call.name, args)?;
                let usage = self.cortex.get_memory_usage();

                let lines: Vec<String> = usage
                    .modules
                    .iter()
                    .map(|m| {
                        format!(
                            "  - {}: {} tokens ({})",
                            m.id,
                            format_tokens(m.size_tokens),
                            m.priority.as_str()
                        )
                    })
                    .collect();
                Ok(format!(
                    "Memory Usage:\n- Used: {} / {} tokens\n- Free: {} tokens\n- Usage: {:.1}%\n\nLoaded Modules:\n{}",
                    format_tokens(usage.used_tokens),
                    format_tokens(usage.limit_tokens),
                    format_tokens(usage.free_tokens),
                    usage.usage_percentage,
                    lines.join("\n")
                ))
            }
            "optimize_memory" => {
                let a: OptimizeMemoryArgs = parse_args(&call.name, args)?;
                let report = self.cortex.optimize_memory(a.target_free)?;

                let mut text = format!(
                    "Memory optimization complete:\n- Freed: {} tokens\n- Free now: {} tokens",
                    format_tokens(report.freed_tokens),
                    format_tokens(report.free_tokens)
                );
                if !report.evicted.is_empty() {
                    text.push_str(&format!("\n- Evicted: {}", join(&report.evicted)));
                }
                Ok(text)
            }
            "provide_feedback" => {
                let a: ProvideFeedbackArgs = parse_args(&call.name, args)?;
                let helpful = a.modules_helpful.clone().unwrap_or_default();
                self.cortex.provide_feedback(InteractionRecord {
                    interaction_id: a.interaction_id.clone(),
                    success: a.success,
                    helpful_modules: helpful.into_iter().map(ModuleId::from).collect(),
                });

                let feedback_type = if a.success { "positive" } else { "negative" };
                let helpful_text = a
                    .modules_helpful
                    .map(|m| format!("\nHelpful modules: {}", m.join(", ")))
                    .unwrap_or_default();
                Ok(format!(
                    "Feedback recorded:\n- Interaction: {}\n- Type: {}{}\n\nThe learning system will use this to improve future module selection.",
                    a.interaction_id, feedback_type, helpful_text
                ))
            }
            other => bail!("Unknown tool: {other}"),
        }
    }
}

fn join(ids: &[ModuleId]) -> String {
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
}
