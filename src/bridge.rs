//! Host-facing entry point: spawns the connection manager and hands back a
//! cloneable handle for commands and shutdown

use crate::config::Config;
use crate::connection::{ConnectionManager, Message};
use crate::error::Result;
use crate::store::{StateChange, StateStore};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Cloneable handle to a running bridge
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl BridgeHandle {
    /// Forward a user-issued value change; `false` once the bridge has stopped
    pub fn command<K: Into<String>>(&self, key: K, value: Value) -> bool {
        self.state_change(StateChange::command(key, value))
    }

    /// Forward any store change, echoes included (the router drops them)
    pub fn state_change(&self, change: StateChange) -> bool {
        self.tx.send(Message::Command(change)).is_ok()
    }

    /// Stop the bridge and wait until the socket is closed
    ///
    /// Always completes, also when called repeatedly or after the bridge has
    /// already exited.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

/// Start the bridge on the current runtime
///
/// The task resolves with the fatal configuration error when the endpoint is
/// missing, otherwise with `Ok` after shutdown.
pub fn spawn<S: StateStore>(config: &Config, store: S) -> (BridgeHandle, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager::new(config, store);
    let task = tokio::spawn(manager.run(rx));
    (BridgeHandle { tx }, task)
}
