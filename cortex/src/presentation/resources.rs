// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-only resources, rendered as pretty JSON

use anyhow::{bail, Result};
use serde::Serialize;

use crate::application::CortexService;

pub const MODULE_CATALOG_URI: &str = "cortex://modules/catalog";
pub const CURRENT_STATE_URI: &str = "cortex://state/current";
pub const LEARNING_METRICS_URI: &str = "cortex://metrics/learning";

#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

pub const RESOURCES: &[ResourceDescriptor] = &[
    ResourceDescriptor {
        uri: MODULE_CATALOG_URI,
        name: "Module Catalog",
        description: "Complete catalog of available cognitive modules",
        mime_type: "application/json",
    },
    ResourceDescriptor {
        uri: CURRENT_STATE_URI,
        name: "Current State",
        description: "Current cognitive state including loaded modules",
        mime_type: "application/json",
    },
    ResourceDescriptor {
        uri: LEARNING_METRICS_URI,
        name: "Learning Metrics",
        description: "Metrics from the learning system",
        mime_type: "application/json",
    },
];

pub fn read_resource(cortex: &CortexService, uri: &str) -> Result<String> {
    let text = match uri {
        MODULE_CATALOG_URI => serde_json::to_string_pretty(&cortex.module_catalog())?,
        CURRENT_STATE_URI => serde_json::to_string_pretty(&cortex.current_state())?,
        LEARNING_METRICS_URI => serde_json::to_string_pretty(&cortex.learning_metrics())?,
        other => bail!("Unknown resource: {other}"),
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::InteractionRecord;
    use crate::domain::config::CortexConfig;
    use crate::domain::module::ModuleId;
    use serde_json::Value;

    fn service() -> CortexService {
        CortexService::from_config(&CortexConfig::default()).unwrap()
    }

    #[test]
    fn test_catalog_resource() {
        let text = read_resource(&service(), MODULE_CATALOG_URI).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["total_modules"], 8);
        assert_eq!(value["counts_by_type"]["capability"], 2);
        assert_eq!(value["modules"][0]["id"], "python_expertise");
        assert_eq!(value["modules"][0]["type"], "knowledge");
        assert_eq!(value["modules"][0]["status"], "available");
    }

    #[test]
    fn test_state_resource() {
        let cortex = service();
        cortex.load_module(&ModuleId::from("core_identity"), None).unwrap();

        let value: Value = serde_json::from_str(&read_resource(&cortex, CURRENT_STATE_URI).unwrap()).unwrap();
        assert_eq!(value["memory"]["used_tokens"], 5_000);
        assert_eq!(value["loaded_modules"][0], "core_identity");
        assert_eq!(value["identity"]["identity"], "assistant");
    }

    #[test]
    fn test_learning_resource() {
        let cortex = service();
        cortex.push_context(None, Some(vec!["story".to_string()]), None);
        for _ in 0..3 {
            cortex.provide_feedback(InteractionRecord {
                interaction_id: "i".to_string(),
                success: true,
                helpful_modules: vec![ModuleId::from("creative_writer")],
            });
        }

        let value: Value = serde_json::from_str(&read_resource(&cortex, LEARNING_METRICS_URI).unwrap()).unwrap();
        assert_eq!(value["total_interactions"], 3);
        assert_eq!(value["associations"]["story"][0], "creative_writer");
    }

    #[test]
    fn test_unknown_resource() {
        let err = read_resource(&service(), "cortex://nope").unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource: cortex://nope");
    }
}
