//! `tandem token`

use anyhow::{Context, Result};
use clap::Subcommand;
use tandem_models::{
    CredentialStore, FileCredentialStore, HfHub, ModelHub, SecretString, DEFAULT_PIPELINE,
};

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Store an access token for later runs
    Set {
        /// Token from https://huggingface.co/settings/tokens
        token: String,
    },

    /// Show where the token lives and whether the hub accepts it
    Check {
        /// Only check that a token is stored
        #[arg(long)]
        offline: bool,
    },
}

pub async fn run(command: TokenCommand) -> Result<()> {
    let store = FileCredentialStore::default_location()?;

    match command {
        TokenCommand::Set { token } => {
            let token = token.trim();
            anyhow::ensure!(!token.is_empty(), "token must not be empty");
            store.set(&SecretString::new(token.to_string()))?;
            println!("Token saved to {}", store.location());
        }
        TokenCommand::Check { offline } => {
            let token = store.get()?;
            println!("Token found at {}", store.location());

            if !offline {
                let hub = HfHub::new()?;
                let visible = hub
                    .model_exists(DEFAULT_PIPELINE, Some(&token))
                    .await
                    .context("Failed to reach the model hub")?;
                if visible {
                    println!("{} is accessible with this token", DEFAULT_PIPELINE);
                } else {
                    println!(
                        "{} is not accessible with this token; accept its terms on the hub first",
                        DEFAULT_PIPELINE
                    );
                }
            }
        }
    }

    Ok(())
}
