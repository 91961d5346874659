//! dm-e2e - Command line entry point
//!
//! Sets up keys for two local users and sends one message between them.
//!
//! ```text
//! DM_E2E_VAULT_SECRET=$(dm-e2e secret) dm-e2e send alice bob "hello"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dm_e2e::vault::generate_vault_secret;
use dm_e2e::{create_shared_state, init_tracing, Config};

#[derive(Parser, Debug)]
#[command(name = "dm-e2e")]
#[command(about = "End-to-end encrypted direct messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Print a fresh base64 vault secret for DM_E2E_VAULT_SECRET
    Secret,

    /// Seal a message for a receiver and open it again as the receiver
    Send {
        /// Sending user id
        sender: String,
        /// Receiving user id
        receiver: String,
        /// Message text
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Secret => {
            println!("{}", generate_vault_secret());
            Ok(())
        }
        Commands::Send {
            sender,
            receiver,
            message,
        } => send(&sender, &receiver, &message).await,
    }
}

async fn send(sender: &str, receiver: &str, message: &str) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let state = create_shared_state(config)
        .await
        .context("Failed to initialize application state")?;

    for user in [sender, receiver] {
        let setup = state.messenger.ensure_user_keys(user).await?;
        tracing::info!("Keys for {}: {:?}", user, setup);
    }

    let payload = state.messenger.seal(sender, receiver, message).await?;
    println!("{}", serde_json::to_string_pretty(&payload)?);

    let opened = state.messenger.open(receiver, &payload).await?;
    println!("{} reads: {}", receiver, opened);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from(["dm-e2e", "send", "alice", "bob", "hello bob"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Send {
                sender: "alice".to_string(),
                receiver: "bob".to_string(),
                message: "hello bob".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_secret() {
        let cli = Cli::try_parse_from(["dm-e2e", "secret"]).unwrap();
        assert_eq!(cli.command, Commands::Secret);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let missing = Cli::try_parse_from(["dm-e2e", "send", "alice", "bob"]).unwrap_err();
        assert_eq!(missing.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let extra = Cli::try_parse_from(["dm-e2e", "secret", "now"]).unwrap_err();
        assert_eq!(extra.kind(), clap::error::ErrorKind::UnknownArgument);

        assert!(Cli::try_parse_from(["dm-e2e"]).is_err());
    }
}
