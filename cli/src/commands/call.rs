// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One-shot tool calls and resource reads

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use cortex_core::presentation::{self, tool_call, ToolDispatcher};

pub fn call_tool(config_path: Option<PathBuf>, tool: &str, args: Option<&str>) -> Result<()> {
    let arguments = args
        .map(serde_json::from_str)
        .transpose()
        .context("--args must be a JSON object")?;

    let (_, cortex) = super::build_service(config_path)?;
    let response = ToolDispatcher::new(cortex).dispatch(&tool_call(tool, arguments));

    if response.is_error {
        eprintln!("{}", response.text.red());
        bail!("Tool {} failed", tool);
    }
    println!("{}", response.text);
    Ok(())
}

pub fn read_resource(config_path: Option<PathBuf>, uri: &str) -> Result<()> {
    let (_, cortex) = super::build_service(config_path)?;
    let text = presentation::read_resource(&cortex, uri)?;
    println!("{}", text);
    Ok(())
}
