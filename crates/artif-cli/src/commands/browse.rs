//! Repository browsing commands

use super::Session;
use anyhow::{Context, Result};
use artif_core::resolve::cancellable;
use artif_core::{browse, find_paths_containing_name, SearchLimits};
use colored::Colorize;

/// List repository keys
pub async fn repos(session: &Session) -> Result<()> {
    let store = session.store()?;
    let repos = cancellable(&session.cancel, browse::list_repositories(store.as_ref()))
        .await
        .context("Failed to list repositories")?;

    println!("{}", "Repositories:".cyan().bold());
    for repo in repos {
        println!("  {}", repo);
    }
    Ok(())
}

/// List the children of a repository folder
pub async fn children(session: &Session, path: &str) -> Result<()> {
    let store = session.store()?;
    let children = cancellable(&session.cancel, browse::list_children(store.as_ref(), path))
        .await
        .with_context(|| format!("Failed to list {}", path))?;

    if children.is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for child in children {
        if child.is_folder {
            println!("  {}/", child.name.blue().bold());
        } else {
            println!("  {}", child.name);
        }
    }
    Ok(())
}

/// Print every path whose name contains `name`
pub async fn find_path(session: &Session, name: &str, max_depth: usize) -> Result<()> {
    let store = session.store()?;
    let paths = cancellable(
        &session.cancel,
        find_paths_containing_name(store.as_ref(), name, SearchLimits { max_depth }),
    )
    .await
    .with_context(|| format!("No path contains '{}'", name))?;

    for path in paths {
        println!("{}", path);
    }
    Ok(())
}
