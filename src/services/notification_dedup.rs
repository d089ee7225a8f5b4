use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{
    error::{BillingError, BillingResult},
    services::{reconciliation::ObligationId, stay_duration::pluralize},
};

pub const SEEN_SET_KEY: &str = "notifications.due_soon.seen";

/// Storage key of the seen-set for one owner scope.
pub fn seen_set_key(scope: &str) -> String {
    format!("{SEEN_SET_KEY}:{scope}")
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> BillingResult<Option<String>>;
    async fn set(&self, key: &str, value: String) -> BillingResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: SyncMutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> BillingResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> BillingResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// All keys live in one JSON object file, replaced atomically on every write.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> BillingResult<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(BillingError::Storage(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        // An unparseable file is replaced on the next write.
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding corrupt key-value store file"
                );
                Ok(Map::new())
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> BillingResult<Option<String>> {
        let entries = self.read_all().await?;
        Ok(entries.get(key).and_then(Value::as_str).map(ToOwned::to_owned))
    }

    async fn set(&self, key: &str, value: String) -> BillingResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), Value::String(value));

        let serialized = serde_json::to_string_pretty(&entries)
            .map_err(|e| BillingError::Storage(format!("Failed to encode store: {e}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BillingError::Storage(format!("Failed to create store dir: {e}")))?;
        }
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, serialized)
            .await
            .map_err(|e| BillingError::Storage(format!("Failed to write store: {e}")))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| BillingError::Storage(format!("Failed to replace store: {e}")))
    }
}

/// Ids that are due now but were never alerted on, and the grown seen-set.
pub fn compute_newly_due(
    due_soon_ids: &[ObligationId],
    seen: &BTreeSet<ObligationId>,
) -> (Vec<ObligationId>, BTreeSet<ObligationId>) {
    let mut updated = seen.clone();
    let mut new_ids = Vec::new();
    for id in due_soon_ids {
        if updated.insert(id.clone()) {
            new_ids.push(id.clone());
        }
    }
    (new_ids, updated)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueAlert {
    pub alert_count: usize,
    pub obligation_ids: Vec<ObligationId>,
    pub message: String,
}

impl DueAlert {
    fn for_new_ids(obligation_ids: Vec<ObligationId>) -> Self {
        let alert_count = obligation_ids.len();
        let verb = if alert_count == 1 { "is" } else { "are" };
        Self {
            alert_count,
            message: format!(
                "{} {verb} due soon",
                pluralize(alert_count as i64, "payment", "payments")
            ),
            obligation_ids,
        }
    }
}

/// Persisted, append-only record of obligations already alerted on.
pub struct NotificationSeenStore {
    store: Arc<dyn KeyValueStore>,
    pass_lock: Mutex<()>,
}

impl NotificationSeenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            pass_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self, scope: &str) -> BillingResult<BTreeSet<ObligationId>> {
        let Some(raw) = self.store.get(&seen_set_key(scope)).await? else {
            return Ok(BTreeSet::new());
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Ok(ids.into_iter().map(ObligationId::from).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable notification seen-set");
                Ok(BTreeSet::new())
            }
        }
    }

    /// Folds this pass's due-soon ids into the owner's seen-set and reports
    /// the ones that were never alerted on for that owner. The union is
    /// written back before returning.
    pub async fn record_due_soon(
        &self,
        scope: &str,
        due_soon_ids: &[ObligationId],
    ) -> BillingResult<Option<DueAlert>> {
        let _guard = self.pass_lock.lock().await;
        let seen = self.load(scope).await?;
        let (new_ids, updated) = compute_newly_due(due_soon_ids, &seen);

        if updated.len() != seen.len() {
            let encoded = serde_json::to_string(
                &updated.iter().map(ObligationId::as_str).collect::<Vec<_>>(),
            )
            .map_err(|e| BillingError::Storage(format!("Failed to encode seen-set: {e}")))?;
            self.store.set(&seen_set_key(scope), encoded).await?;
        }

        if new_ids.is_empty() {
            return Ok(None);
        }
        let alert = DueAlert::for_new_ids(new_ids);
        tracing::info!(count = alert.alert_count, "Newly due payments detected");
        Ok(Some(alert))
    }
}
