//! Config command - Manage persisted defaults

use crate::config::SettingsManager;
use anyhow::{Context, Result};
use artif_core::store::DEFAULT_TIMEOUT_SECS;
use artif_core::Settings;
use colored::Colorize;

/// Set the repository API address
pub async fn set_server(url: &str) -> Result<()> {
    let url = url.trim().trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!(
            "Invalid URL: {}. URL must start with http:// or https://",
            url
        );
    }

    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.server = url.to_string();
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!("{} Server set to: {}", "✓".green(), url.cyan());
    if !url.ends_with("/api") {
        println!(
            "{}",
            "  Note: the server address is usually the API base ending in /api."
                .yellow()
                .dimmed()
        );
    }
    Ok(())
}

pub async fn set_token(token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("Token must not be empty");
    }

    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.token = token.to_string();
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!("{} Token saved", "✓".green());
    Ok(())
}

pub async fn set_timeout(secs: u64) -> Result<()> {
    if secs == 0 {
        anyhow::bail!("Timeout must be at least one second");
    }

    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.timeout_secs = Some(secs);
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!("{} Request timeout set to {}s", "✓".green(), secs);
    Ok(())
}

pub async fn set_output_dir(dir: &str) -> Result<()> {
    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.output_dir = dir.trim().to_string();
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!("{} Output directory set to: {}", "✓".green(), dir.cyan());
    Ok(())
}

pub async fn set_log_level(level: &str) -> Result<()> {
    let mut settings = SettingsManager::load().context("Failed to load settings")?;
    settings.log_level = level.trim().to_lowercase();
    SettingsManager::save(&settings).context("Failed to save settings")?;

    println!("{} Log level set to: {}", "✓".green(), settings.log_level.cyan());
    Ok(())
}

/// Show current configuration
pub async fn show() -> Result<()> {
    let settings = SettingsManager::load().context("Failed to load settings")?;

    println!("{}", "Artif Configuration".bold().underline());
    println!();

    println!("{}", "Repository:".cyan().bold());
    println!("  Server:  {}", or_unset(&settings.server));
    println!(
        "  Token:   {}",
        if settings.token.is_empty() {
            "not set".yellow()
        } else {
            "saved".green()
        }
    );
    println!(
        "  Timeout: {}s",
        settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    );
    println!();

    println!("{}", "Defaults:".cyan().bold());
    println!("  Output directory: {}", or_unset(&settings.output_dir));
    println!("  Log level:        {}", or_unset(&settings.log_level));
    println!();

    println!("{}", "Config Files:".cyan().bold());
    println!(
        "  Settings: {}",
        SettingsManager::settings_path()?.display().to_string().dimmed()
    );

    Ok(())
}

/// Reset to default configuration
pub async fn reset() -> Result<()> {
    SettingsManager::save(&Settings::default()).context("Failed to save settings")?;
    println!("{} Configuration reset to defaults", "✓".green());
    Ok(())
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "not set".yellow().to_string()
    } else {
        value.to_string()
    }
}
