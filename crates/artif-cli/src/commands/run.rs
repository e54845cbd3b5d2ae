//! Run command - execute one component against a config bag

use super::Session;
use anyhow::{Context, Result};
use artif_adapters::create_registry;
use artif_core::{ComponentOutput, ConfigManager, ExecutionContext};
use colored::Colorize;
use std::path::Path;
use tracing::info;

/// Config bag from a YAML or JSON file; no file means an empty bag
pub fn load_config(path: Option<&Path>) -> Result<serde_json::Value> {
    match path {
        Some(path) => ConfigManager::load_value(path)
            .with_context(|| format!("Failed to load component config from {:?}", path)),
        None => Ok(serde_json::Value::Object(Default::default())),
    }
}

/// `logging` level carried in a config bag
pub fn config_log_level(raw: &serde_json::Value) -> Option<String> {
    ["logging", "artifactory_logging"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn execute(session: &Session, name: Option<&str>, raw: serde_json::Value) -> Result<()> {
    let registry = create_registry();
    let mut component = match name {
        Some(name) => registry.create(name).with_context(|| {
            format!(
                "Unknown component '{}'. Run `artif components` to list them",
                name
            )
        })?,
        None => registry
            .create_default()
            .context("No default component registered")?,
    };

    component.configure(raw, &session.component_env())?;

    let ctx = if component.needs_store() {
        let mut server = component.server().clone();
        if server.timeout_secs.is_none() {
            server.timeout_secs = session.server.timeout_secs;
        }
        ExecutionContext::new(server.connect()?)
    } else {
        ExecutionContext::offline()
    }
    .with_cancellation(session.cancel.clone());

    info!("Running {} {}", component.kind(), component.name());
    let output = component
        .execute(&ctx)
        .await
        .with_context(|| format!("{} failed", component.name()))?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    if let ComponentOutput::Transfers(report) = &output {
        for failure in &report.failed {
            eprintln!(
                "{} {}: {}",
                "⚠".yellow(),
                failure.file.yellow(),
                failure.error
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_config_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("source.yaml");
        std::fs::write(&yaml, "artifact_name: win22\nfile_type: ova\nlogging: DEBUG\n").unwrap();
        let raw = load_config(Some(&yaml)).unwrap();
        assert_eq!(raw["artifact_name"], "win22");
        assert_eq!(config_log_level(&raw).as_deref(), Some("DEBUG"));

        let jsonf = dir.path().join("source.json");
        std::fs::write(&jsonf, r#"{"artifact_name": "rhel9"}"#).unwrap();
        let raw = load_config(Some(&jsonf)).unwrap();
        assert_eq!(raw["artifact_name"], "rhel9");
        assert_eq!(config_log_level(&raw), None);

        assert_eq!(load_config(None).unwrap(), json!({}));
    }
}
