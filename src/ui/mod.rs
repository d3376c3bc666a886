mod controller;
mod page;


pub use controller::{ScrollMetrics, UiController, Viewport};
pub use page::{ButtonStyle, CardTone, MovieCard, Page, SettingsField};

use crate::protocol::ClientEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("not connected to the hub")]
    Disconnected,
    #[error("outbound queue closed")]
    Closed,
}

/// Outbound half of the real-time connection.
pub trait Channel {
    fn is_connected(&self) -> bool;
    fn emit(&mut self, event: ClientEvent) -> Result<(), ChannelError>;
}

/// Small key/value store for client-local preferences.
pub trait PreferenceStore {
    fn load(&self, key: &str) -> Option<String>;
    fn store(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl PreferenceStore for MemoryPreferences {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
