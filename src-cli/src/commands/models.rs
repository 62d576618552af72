//! `tandem models`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tandem_models::registry::get_all_models;
use tandem_models::{CredentialStore, FileCredentialStore, ModelManager, SecretString};

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Model cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub action: ModelsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List downloadable models and what is cached
    List,

    /// Download a model by ID
    Download {
        id: String,

        /// Hub access token (defaults to the stored one)
        #[arg(long)]
        token: Option<String>,
    },

    /// Delete a downloaded model
    Delete { id: String },

    /// Delete every downloaded model
    Clear,
}

pub async fn run(args: ModelsArgs) -> Result<()> {
    let manager = match args.cache_dir {
        Some(dir) => ModelManager::with_cache_dir(dir)?,
        None => ModelManager::new()?,
    };

    match args.action {
        ModelsCommand::List => {
            println!("Cache: {}", manager.cache_directory().display());
            for model in get_all_models() {
                let marker = if manager.is_downloaded(&model) { "*" } else { " " };
                println!(
                    "{} {:<24} {:>8}  {}",
                    marker,
                    model.id,
                    model.size_string(),
                    model.description
                );
            }
            println!(
                "\n{} downloaded, {:.1} MB on disk",
                manager.list_downloaded().len(),
                manager.disk_usage() as f64 / (1024.0 * 1024.0)
            );
        }
        ModelsCommand::Download { id, token } => {
            let token = match token {
                Some(token) => Some(SecretString::new(token)),
                None => FileCredentialStore::default_location()?.get().ok(),
            };

            let progress = ProgressBar::new(0);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
                    .progress_chars("=> "),
            );
            progress.set_message(id.clone());

            let bar = progress.clone();
            let path = manager
                .download_by_id(&id, token.as_ref(), move |p| {
                    if let Some(total) = p.total {
                        bar.set_length(total);
                    }
                    bar.set_position(p.received);
                })
                .await
                .with_context(|| format!("Failed to download {}", id))?;

            progress.finish_and_clear();
            println!("{}", path.display());
        }
        ModelsCommand::Delete { id } => {
            if manager.remove(&id).await? {
                println!("Deleted {}", id);
            } else {
                println!("{} is not downloaded", id);
            }
        }
        ModelsCommand::Clear => {
            manager.clear_cache().await?;
            println!("Cleared {}", manager.cache_directory().display());
        }
    }

    Ok(())
}
