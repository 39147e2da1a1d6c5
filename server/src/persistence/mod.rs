//! Persistence layer for the game server.
//!
//! The game loop never blocks on I/O: account saves are fire-and-forget
//! commands handled by a background task, and loads are awaited only
//! during login.

mod store;

pub use store::{Store, RegisterError, AuthError, hash_password, verify_password};

use log::{info, error};
use tokio::sync::mpsc;

use crate::entities::PlayerRecord;

/// Commands sent to the persistence background task
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Save an account record
    SaveAccount {
        username: String,
        record: PlayerRecord,
    },
    /// Load an account record (response sent via oneshot channel)
    LoadAccount {
        username: String,
        response: tokio::sync::oneshot::Sender<Option<PlayerRecord>>,
    },
    /// Shutdown the persistence task
    Shutdown,
}

/// Handle for sending commands to the persistence task
#[derive(Clone)]
pub struct PersistenceHandle {
    sender: mpsc::Sender<PersistenceCommand>,
}

impl PersistenceHandle {
    /// Save an account record (fire and forget - non-blocking)
    pub fn save_account(&self, username: &str, record: PlayerRecord) {
        let _ = self.sender.try_send(PersistenceCommand::SaveAccount {
            username: username.to_string(),
            record,
        });
    }

    /// Load an account record (async - use sparingly, e.g. on login)
    pub async fn load_account(&self, username: &str) -> Option<PlayerRecord> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .sender
            .send(PersistenceCommand::LoadAccount {
                username: username.to_string(),
                response: tx,
            })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Shutdown the persistence task
    pub async fn shutdown(&self) {
        let _ = self.sender.send(PersistenceCommand::Shutdown).await;
    }
}

/// Spawn the background persistence task over a connected store.
/// Returns a handle for sending commands.
pub fn spawn(store: Store) -> PersistenceHandle {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(persistence_task(store, rx));
    info!("Persistence background task started");
    PersistenceHandle { sender: tx }
}

/// Background task that handles all persistence operations
async fn persistence_task(store: Store, mut rx: mpsc::Receiver<PersistenceCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            PersistenceCommand::SaveAccount { username, record } => {
                if let Err(e) = store.save_account(&username, &record).await {
                    error!("Failed to save account '{}': {}", username, e);
                }
            }

            PersistenceCommand::LoadAccount { username, response } => {
                let result = match store.load_account(&username).await {
                    Ok(record) => record,
                    Err(e) => {
                        error!("Failed to load account '{}': {}", username, e);
                        None
                    }
                };
                let _ = response.send(result);
            }

            PersistenceCommand::Shutdown => {
                info!("Persistence task shutting down");
                break;
            }
        }
    }

    info!("Persistence task stopped");
}
