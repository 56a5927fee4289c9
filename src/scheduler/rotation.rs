//! Round-robin credential rotation
//!
//! Each provider owns an ordered list of API keys and a cursor pointing at
//! the active one. Rotation advances the cursor circularly; the list itself
//! is never reordered, so insertion order is rotation order.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::ApiKeyRecord;

// ============================================================================
// Provider Pool
// ============================================================================

/// Keys for a single provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderPool {
    keys: Vec<ApiKeyRecord>,
    cursor: usize,
}

impl ProviderPool {
    fn active(&self) -> Option<&ApiKeyRecord> {
        self.keys.get(self.cursor)
    }

    fn rotate(&mut self) -> bool {
        if self.keys.len() <= 1 {
            return false;
        }
        self.cursor = (self.cursor + 1) % self.keys.len();
        true
    }

    fn clamp_cursor(&mut self) {
        self.cursor = match self.keys.len() {
            0 => 0,
            n => self.cursor.min(n - 1),
        };
    }
}

// ============================================================================
// Key Pool
// ============================================================================

/// Credential pools keyed by provider name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct KeyPool {
    providers: BTreeMap<String, ProviderPool>,
}

impl KeyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key to the provider's rotation. Returns its id.
    pub fn add(
        &mut self,
        provider: &str,
        secret: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.providers
            .entry(provider.to_string())
            .or_default()
            .keys
            .push(ApiKeyRecord {
                id,
                secret: secret.into(),
                display_name: display_name.into(),
                usage_count: 0,
                last_used_at: None,
            });
        id
    }

    /// Remove a key by id. The cursor is clamped into the shortened list.
    pub fn remove(&mut self, provider: &str, id: Uuid) -> bool {
        let Some(pool) = self.providers.get_mut(provider) else {
            return false;
        };
        let Some(index) = pool.keys.iter().position(|k| k.id == id) else {
            return false;
        };
        pool.keys.remove(index);
        pool.clamp_cursor();
        true
    }

    /// Advance to the next key. No-op with one key or none.
    pub fn rotate(&mut self, provider: &str) -> bool {
        self.providers
            .get_mut(provider)
            .is_some_and(ProviderPool::rotate)
    }

    /// Count one use of a key and stamp the time.
    pub fn record_usage(&mut self, provider: &str, id: Uuid) -> bool {
        let key = self
            .providers
            .get_mut(provider)
            .and_then(|pool| pool.keys.iter_mut().find(|k| k.id == id));
        match key {
            Some(key) => {
                key.usage_count += 1;
                key.last_used_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub fn active(&self, provider: &str) -> Option<&ApiKeyRecord> {
        self.providers.get(provider).and_then(ProviderPool::active)
    }

    /// Keys in rotation order.
    pub fn keys(&self, provider: &str) -> &[ApiKeyRecord] {
        self.providers
            .get(provider)
            .map(|pool| pool.keys.as_slice())
            .unwrap_or_default()
    }

    pub fn cursor(&self, provider: &str) -> usize {
        self.providers.get(provider).map_or(0, |pool| pool.cursor)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Find which provider owns a key.
    pub fn provider_of(&self, id: Uuid) -> Option<&str> {
        self.providers
            .iter()
            .find(|(_, pool)| pool.keys.iter().any(|k| k.id == id))
            .map(|(name, _)| name.as_str())
    }
}
