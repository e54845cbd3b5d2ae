//! Resolve command - pick the latest artifact matching a name

use super::Session;
use anyhow::{Context, Result};
use artif_core::{resolve_artifact, ResolveRequest};
use artif_types::PropertyFilter;
use colored::Colorize;

pub struct ResolveOptions {
    pub name: String,
    pub file_type: Option<String>,
    pub channel: Option<String>,
    pub properties: Vec<String>,
    pub json: bool,
}

pub fn build_request(opts: &ResolveOptions) -> Result<ResolveRequest> {
    let mut request = ResolveRequest::new(opts.name.trim())
        .with_file_type(opts.file_type.clone().unwrap_or_default());
    request.properties =
        PropertyFilter::from_tokens(&opts.properties).context("Invalid --property value")?;
    if let Some(channel) = opts.channel.as_deref().filter(|c| !c.trim().is_empty()) {
        request = request.with_property("channel", channel.trim());
    }
    Ok(request)
}

pub async fn run(session: &Session, opts: ResolveOptions) -> Result<()> {
    let request = build_request(&opts)?;
    let store = session.store()?;

    let resolution = resolve_artifact(store.as_ref(), &request, &session.cancel)
        .await
        .with_context(|| format!("Could not resolve '{}'", request.name))?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&resolution.artifact)?);
        return Ok(());
    }

    let artifact = &resolution.artifact;
    println!("{} {}", "✓".green(), artifact.name.cyan().bold());
    println!("  Created:      {}", artifact.created);
    println!("  Artifact URI: {}", artifact.artifact_uri);
    println!("  Download URI: {}", artifact.download_uri);

    let report = &resolution.report;
    let mut stages = vec![format!("{} by name", report.name_matches)];
    if let Some(n) = report.type_matches {
        stages.push(format!("{} by type", n));
    }
    if let Some(n) = report.shortlisted {
        stages.push(format!("{} by properties", n));
    }
    if let Some(n) = report.dated {
        stages.push(format!("{} dated", n));
    }
    println!("  Candidates:   {}", stages.join(" → ").dimmed());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_becomes_property() {
        let opts = ResolveOptions {
            name: " win22 ".to_string(),
            file_type: Some("ova".to_string()),
            channel: Some("stable".to_string()),
            properties: vec!["release=2024".to_string()],
            json: false,
        };
        let request = build_request(&opts).unwrap();
        assert_eq!(request.name, "win22");
        assert_eq!(request.file_type, "ova");
        assert_eq!(
            request.properties.to_tokens(),
            vec!["channel=stable".to_string(), "release=2024".to_string()]
        );
    }

    #[test]
    fn test_rejects_malformed_property() {
        let opts = ResolveOptions {
            name: "win22".to_string(),
            file_type: None,
            channel: None,
            properties: vec!["release".to_string()],
            json: false,
        };
        assert!(build_request(&opts).is_err());
    }
}
