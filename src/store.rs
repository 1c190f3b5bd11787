//! The state store the bridge publishes into
//!
//! The host owns the real store; the bridge only needs a way to declare its
//! channels and to push values. `MemoryStore` keeps everything in process and
//! is what tests and embedders without a store of their own use.

use crate::telemetry::ChannelDef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Sink for published values
///
/// Calls are fire-and-forget and must not block: they run inside the
/// connection manager's event handlers.
pub trait StateStore: Send + Sync + 'static {
    /// Declare a channel; a store that already has it keeps its current value
    fn define(&self, _channel: &ChannelDef) {}

    /// Publish an acknowledged value
    fn publish(&self, key: &str, value: Value);
}

impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    fn define(&self, channel: &ChannelDef) {
        (**self).define(channel)
    }

    fn publish(&self, key: &str, value: Value) {
        (**self).publish(key, value)
    }
}

/// A change of a store value, as delivered to `onCommand` subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub key: String,
    pub value: Value,
    /// `true` when the value was published by the bridge itself
    #[serde(default)]
    pub ack: bool,
}

impl StateChange {
    /// A user-issued change
    pub fn command<K: Into<String>>(key: K, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            ack: false,
        }
    }

    /// An echo of a value the bridge published
    pub fn acknowledged<K: Into<String>>(key: K, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            ack: true,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    latest: HashMap<String, Value>,
    history: Vec<(String, Value)>,
    defined: Vec<String>,
}

/// In-process store recording every publish
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value of `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .lock()
            .ok()
            .and_then(|s| s.latest.get(key).cloned())
    }

    /// Every value ever published on `key`, oldest first
    pub fn history_of(&self, key: &str) -> Vec<Value> {
        self.inner
            .lock()
            .map(|s| {
                s.history
                    .iter()
                    .filter(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of publishes across all keys
    pub fn publish_count(&self) -> usize {
        self.inner.lock().map(|s| s.history.len()).unwrap_or(0)
    }

    /// Ids of the declared channels, in declaration order
    pub fn defined(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|s| s.defined.clone())
            .unwrap_or_default()
    }
}

impl StateStore for MemoryStore {
    fn define(&self, channel: &ChannelDef) {
        if let Ok(mut s) = self.inner.lock() {
            if !s.defined.iter().any(|id| id == channel.id) {
                s.defined.push(channel.id.to_string());
            }
        }
    }

    fn publish(&self, key: &str, value: Value) {
        if let Ok(mut s) = self.inner.lock() {
            s.latest.insert(key.to_string(), value.clone());
            s.history.push((key.to_string(), value));
        }
    }
}
