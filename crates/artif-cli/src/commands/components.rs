//! Components command - list registered data sources and post-processors

use anyhow::Result;
use artif_adapters::create_registry;
use colored::Colorize;

pub fn list() -> Result<()> {
    let registry = create_registry();
    let default = registry.default_name();

    println!("{}", "Components:".cyan().bold());
    for (name, kind) in registry.list() {
        let marker = if Some(name) == default {
            " (default)".green()
        } else {
            "".normal()
        };
        println!("  {:<16} {}{}", name, kind.to_string().dimmed(), marker);
    }
    Ok(())
}
