//! dm-e2e - End-to-end encryption core for direct messages
//!
//! Messages are sealed with a one-time AES-256-GCM key that is wrapped with
//! the recipient's RSA-OAEP public key. Private keys live in an encrypted
//! local vault; public keys are shared through a key directory.

pub mod config;
pub mod crypto;
pub mod db;
pub mod directory;
pub mod error;
pub mod messaging;
pub mod models;
pub mod state;
pub mod vault;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use messaging::Messenger;
pub use state::{create_shared_state, AppState, SharedState};

/// Initialize logging
///
/// Honors `RUST_LOG`, defaulting to `dm_e2e=info`. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dm_e2e=info".into()),
        )
        .try_init();
}
