//! CLI mode
//!
//! Link management straight against the configured store, without going
//! through the HTTP API.

use anyhow::Result;
use colored::Colorize;

use crate::auth::Identity;
use crate::cli::Commands;
use crate::config::StaticConfig;
use crate::errors::LinkmapError;
use crate::services::LinkRepository;
use crate::storage::{LinkEntry, StorageFactory};

/// Run one management command. `Serve` is handled by the caller.
pub async fn run_cli(config: &StaticConfig, command: Commands) -> Result<()> {
    if let Commands::ConfigGen { output } = &command {
        return generate_config(output.as_deref());
    }

    let store = StorageFactory::create(&config.storage).await?;
    let repo = LinkRepository::new(store);

    let outcome = match command {
        Commands::List => list_links(&repo).await,
        Commands::Add { key, url, author } => {
            let link = repo.create(&key, &url, &Identity::operator(author)).await;
            link.map(|l| print_mutation("Added", &l))
        }
        Commands::Update { key, url, author } => {
            let link = repo.update(&key, &url, &Identity::operator(author)).await;
            link.map(|l| print_mutation("Updated", &l))
        }
        Commands::Remove { key } => repo.delete(&key).await.map(|l| print_mutation("Removed", &l)),
        Commands::Repair => repair(&repo).await,
        Commands::Serve | Commands::ConfigGen { .. } => Ok(()),
    };

    outcome.map_err(|e| {
        eprintln!("{}", e.format_colored());
        anyhow::anyhow!(e)
    })
}

async fn list_links(repo: &LinkRepository) -> Result<(), LinkmapError> {
    let links = repo.list().await?;
    if links.is_empty() {
        println!("{} No short links", "ℹ".bold().blue());
        return Ok(());
    }

    println!("{}", "Short links:".bold().green());
    println!();
    for link in &links {
        println!(
            "  {} -> {} {}",
            link.key.cyan(),
            link.target_url.blue(),
            format!(
                "({} at {})",
                link.created_by,
                link.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            )
            .dimmed()
        );
    }
    println!();
    println!(
        "{} {} short links in total",
        "ℹ".bold().blue(),
        links.len().to_string().green()
    );
    Ok(())
}

fn print_mutation(verb: &str, link: &LinkEntry) {
    println!(
        "{} {} short link: {} -> {}",
        "✓".bold().green(),
        verb,
        link.key.cyan(),
        link.target_url.blue()
    );
}

async fn repair(repo: &LinkRepository) -> Result<(), LinkmapError> {
    let report = repo.reconcile().await?;
    println!("{} Reconcile finished", "✓".bold().green());
    println!("  orphaned metadata removed: {}", report.orphans_removed.to_string().yellow());
    println!("  metadata repaired:         {}", report.metadata_repaired.to_string().yellow());
    println!("  legacy entries:            {}", report.legacy_entries.to_string().yellow());
    Ok(())
}

fn generate_config(output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            StaticConfig::default().save_to_file(path)?;
            println!("{} Sample configuration written to {}", "✓".bold().green(), path.cyan());
        }
        None => print!("{}", StaticConfig::generate_sample_config()),
    }
    Ok(())
}
