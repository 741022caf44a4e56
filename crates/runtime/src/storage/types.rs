//! Save records, metadata, and the per-device save index.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::Result;

/// One persisted save.
///
/// `last_modified` is refreshed by the storage provider immediately before
/// every persisted write and is the only field consulted when local and
/// remote copies disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub save_id: String,
    pub save_name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl SaveRecord {
    /// New record with a fresh save id, stamped with the current time.
    pub fn new(save_name: impl Into<String>) -> Self {
        Self::new_at(save_name, Utc::now())
    }

    pub fn new_at(save_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            save_id: Uuid::new_v4().to_string(),
            save_name: save_name.into(),
            created_at: now,
            last_modified: now,
            payload: serde_json::Value::Null,
        }
    }

    /// Replace the payload with the JSON form of `value`.
    pub fn with_payload<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.set_payload(value)?;
        Ok(self)
    }

    pub fn set_payload<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.payload = serde_json::to_value(value)?;
        Ok(())
    }

    /// Decode the payload as `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Summary of a stored save, produced without handing out the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub slot_id: String,
    pub save_id: String,
    pub save_name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Size of the serialized record in bytes.
    pub size_bytes: usize,
}

impl SaveMetadata {
    pub(crate) fn from_record(slot_id: &str, record: &SaveRecord, size_bytes: usize) -> Self {
        Self {
            slot_id: slot_id.to_string(),
            save_id: record.save_id.clone(),
            save_name: record.save_name.clone(),
            created_at: record.created_at,
            last_modified: record.last_modified,
            size_bytes,
        }
    }
}

/// Slot ids known to this device, in first-saved order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveIndex {
    slots: Vec<String>,
}

impl SaveIndex {
    /// Add `slot_id`. Returns `false` if it was already present.
    pub fn insert(&mut self, slot_id: &str) -> bool {
        if self.contains(slot_id) {
            return false;
        }
        self.slots.push(slot_id.to_string());
        true
    }

    /// Remove `slot_id`. Returns `false` if it was absent.
    pub fn remove(&mut self, slot_id: &str) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot != slot_id);
        self.slots.len() != before
    }

    pub fn contains(&self, slot_id: &str) -> bool {
        self.slots.iter().any(|slot| slot == slot_id)
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl FromIterator<String> for SaveIndex {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut index = SaveIndex::default();
        for slot in iter {
            index.insert(&slot);
        }
        index
    }
}

/// Outcome of a bulk push to the cloud.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
}

/// Tunables for blob-store-backed save providers.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Category prefix for save keys (`{category}_{slot_id}`).
    pub category: String,

    /// Blob key of the save index.
    pub index_key: String,

    /// Maximum number of distinct slots; `None` means unlimited.
    pub max_save_slots: Option<usize>,
}

impl StorageConfig {
    pub fn save_key(&self, slot_id: &str) -> String {
        format!("{}_{}", self.category, slot_id)
    }

    /// Inverse of [`save_key`](Self::save_key).
    pub fn slot_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.category.as_str())?
            .strip_prefix('_')
            .filter(|slot| !slot.is_empty())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            category: "Saves".to_string(),
            index_key: "SaveIndex".to_string(),
            max_save_slots: None,
        }
    }
}
