// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! JSON-lines request/response envelope
//!
//! One request object per line in, one response object per line out.
//! Malformed lines produce an error response rather than ending the session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::application::CortexService;

use super::resources::{read_resource, ResourceDescriptor, RESOURCES};
use super::tools::{ToolCall, ToolDescriptor, ToolDispatcher, ToolResponse};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    ListTools,
    CallTool(ToolCall),
    ListResources,
    ReadResource { uri: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Tools { tools: &'static [ToolDescriptor] },
    ToolResult(ToolResponse),
    Resources { resources: &'static [ResourceDescriptor] },
    Resource { uri: String, text: String },
    Error { message: String },
}

#[derive(Clone)]
pub struct RequestHandler {
    cortex: Arc<CortexService>,
    tools: ToolDispatcher,
}

impl RequestHandler {
    pub fn new(cortex: Arc<CortexService>) -> Self {
        Self {
            tools: ToolDispatcher::new(cortex.clone()),
            cortex,
        }
    }

    pub fn tools(&self) -> &ToolDispatcher {
        &self.tools
    }

    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::ListTools => Response::Tools {
                tools: self.tools.list_tools(),
            },
            Request::CallTool(call) => Response::ToolResult(self.tools.dispatch(&call)),
            Request::ListResources => Response::Resources { resources: RESOURCES },
            Request::ReadResource { uri } => match read_resource(&self.cortex, &uri) {
                Ok(text) => Response::Resource { uri, text },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            },
        }
    }

    /// Handle one raw line, always producing a serialized response line
    pub fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => Response::Error {
                message: format!("Invalid request: {e}"),
            },
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            serde_json::json!({ "kind": "error", "message": e.to_string() }).to_string()
        })
    }
}

/// Convenience for building a call from a tool name and raw JSON arguments
pub fn tool_call(name: impl Into<String>, arguments: Option<Value>) -> ToolCall {
    ToolCall {
        name: name.into(),
        arguments: arguments.unwrap_or(Value::Null),
    }
}
