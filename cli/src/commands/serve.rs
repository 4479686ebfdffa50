// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! JSON-lines session over stdin/stdout
//!
//! Runs until stdin closes or Ctrl-C, with the background memory optimizer
//! alongside. Every request line gets exactly one response line.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use cortex_core::application::{MemoryOptimizer, MemoryOptimizerConfig};
use cortex_core::domain::module::ModuleId;
use cortex_core::infrastructure::{EventBusError, ModuleEventReceiver};
use cortex_core::presentation::RequestHandler;

pub async fn run(config_path: Option<PathBuf>, watch: Vec<String>) -> Result<()> {
    let (config, cortex) = super::build_service(config_path)?;

    let mut watchers = Vec::with_capacity(watch.len());
    for module in watch {
        let module_id = ModuleId::from(module.as_str());
        cortex.get_module(&module_id).context("Cannot watch module")?;
        watchers.push(tokio::spawn(watch_module(cortex.subscribe_module(&module_id), module_id)));
    }

    let optimizer = Arc::new(MemoryOptimizer::new(
        cortex.clone(),
        MemoryOptimizerConfig::from(&config.spec.optimizer),
    ));
    let shutdown = optimizer.shutdown_token();
    let optimizer_handle = optimizer.start();

    let mut events = cortex.subscribe();
    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(event_type = event.event_type(), "Cortex event"),
                Err(EventBusError::Lagged(skipped)) => debug!(skipped, "Event logger lagged"),
                Err(_) => break,
            }
        }
    });

    info!("Cortex serving JSON-lines on stdio");
    let handler = RequestHandler::new(cortex);
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = serve_lines(&handler, stdin, stdout) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
    }

    shutdown.cancel();
    event_logger.abort();
    for watcher in watchers {
        watcher.abort();
    }
    optimizer_handle
        .await
        .context("Memory optimizer task panicked")?;

    info!("Cortex session ended");
    Ok(())
}

async fn watch_module(mut events: ModuleEventReceiver, module_id: ModuleId) {
    loop {
        match events.recv().await {
            Ok(event) => info!(
                module_id = %module_id,
                event_type = event.event_type(),
                event = %serde_json::to_string(&event).unwrap_or_default(),
                "Watched module event"
            ),
            Err(EventBusError::Lagged(skipped)) => debug!(module_id = %module_id, skipped, "Module watcher lagged"),
            Err(_) => break,
        }
    }
}

/// Answer each non-blank line until the reader is exhausted
pub async fn serve_lines<R, W>(handler: &RequestHandler, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handler.handle_line(&line);
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::application::CortexService;
    use cortex_core::domain::config::CortexConfig;
    use serde_json::Value;

    #[tokio::test]
    async fn test_serve_lines() {
        let cortex = Arc::new(CortexService::from_config(&CortexConfig::default()).unwrap());
        let handler = RequestHandler::new(cortex.clone());

        let input = concat!(
            r#"{"method":"call_tool","name":"load_module","arguments":{"module_id":"html_css"}}"#,
            "\n\n",
            r#"{"method":"read_resource","uri":"cortex://state/current"}"#,
            "\n",
            "garbage\n",
        );
        let mut output = Vec::new();
        serve_lines(&handler, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["text"], "Successfully loaded module: html_css");
        assert_eq!(responses[1]["kind"], "resource");
        assert_eq!(responses[2]["kind"], "error");
        assert_eq!(cortex.get_memory_usage().used_tokens, 12_000);
    }
}
