// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod protocol;
pub mod resources;
pub mod tools;

pub use protocol::{tool_call, Request, RequestHandler, Response};
pub use resources::read_resource;
pub use tools::{ToolCall, ToolDispatcher, ToolResponse};
