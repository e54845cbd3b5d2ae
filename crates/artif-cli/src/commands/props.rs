//! Property commands

use super::Session;
use anyhow::{Context, Result};
use artif_core::resolve::cancellable;
use artif_core::{metadata, properties};
use artif_types::{Properties, PropertyFilter};
use colored::Colorize;

/// Parse `key=value` arguments
pub fn parse_assignments(tokens: &[String]) -> Result<Properties> {
    let filter = PropertyFilter::from_tokens(tokens).context("Expected key=value")?;
    Ok(filter.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

pub async fn get(session: &Session, uri: &str, keys: &[String]) -> Result<()> {
    let store = session.store()?;
    let artifact = session.artifact(uri)?;
    let props = cancellable(
        &session.cancel,
        metadata::get_properties(store.as_ref(), &artifact, keys),
    )
    .await
    .with_context(|| format!("Failed to read properties of {}", artifact))?;

    for (key, value) in props.iter() {
        println!("  {} = {}", key.cyan(), value);
    }
    Ok(())
}

pub async fn set(session: &Session, uri: &str, assignments: &[String]) -> Result<()> {
    let store = session.store()?;
    let artifact = session.artifact(uri)?;
    let props = parse_assignments(assignments)?;

    cancellable(
        &session.cancel,
        properties::set_properties(store.as_ref(), &artifact, &props),
    )
    .await
    .with_context(|| format!("Failed to set properties on {}", artifact))?;

    println!(
        "{} Set {} propert{} on {}",
        "✓".green(),
        props.len(),
        if props.len() == 1 { "y" } else { "ies" },
        artifact.file_name.cyan()
    );
    Ok(())
}

pub async fn delete(session: &Session, uri: &str, keys: &[String]) -> Result<()> {
    let store = session.store()?;
    let artifact = session.artifact(uri)?;

    cancellable(
        &session.cancel,
        properties::delete_properties(store.as_ref(), &artifact, keys),
    )
    .await
    .with_context(|| format!("Failed to delete properties from {}", artifact))?;

    println!(
        "{} Removed {} from {}",
        "✓".green(),
        keys.join(", "),
        artifact.file_name.cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        let props =
            parse_assignments(&["release=stable".to_string(), "build=42".to_string()]).unwrap();
        assert_eq!(props.get("release"), Some("stable"));
        assert_eq!(props.get("build"), Some("42"));

        assert!(parse_assignments(&["=x".to_string()]).is_err());
    }
}
