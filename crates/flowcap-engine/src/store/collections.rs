use super::{
    ActionStore, CLIPBOARD_ACTIONS_KEY, FAVORITE_ACTIONS_KEY, RECORDED_ACTIONS_KEY, StoreError,
};
use flowcap_common::action::ActionRecord;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Recorded,
    Clipboard,
    Favorites,
}

impl Collection {
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Recorded => RECORDED_ACTIONS_KEY,
            Collection::Clipboard => CLIPBOARD_ACTIONS_KEY,
            Collection::Favorites => FAVORITE_ACTIONS_KEY,
        }
    }
}

/// Typed access to the action collections.
///
/// Storage failures never reach the caller: reads fall back to an empty
/// list and mutations report `false`, both after logging the cause.
#[derive(Clone)]
pub struct ActionCollections {
    store: Arc<dyn ActionStore>,
}

impl ActionCollections {
    pub fn new(store: Arc<dyn ActionStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, collection: Collection) -> Vec<ActionRecord> {
        match self.load(collection).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read {}: {}", collection.key(), e);
                Vec::new()
            }
        }
    }

    pub async fn get(&self, collection: Collection, id: &str) -> Option<ActionRecord> {
        self.list(collection).await.into_iter().find(|r| r.id == id)
    }

    /// Appends a record unless its id is already present.
    pub async fn add(&self, collection: Collection, record: ActionRecord) -> bool {
        self.add_many(collection, vec![record]).await == 1
    }

    /// Appends every record whose id is not yet present, in one write.
    /// Returns how many were added.
    pub async fn add_many(&self, collection: Collection, records: Vec<ActionRecord>) -> usize {
        self.mutate(collection, |existing| {
            let before = existing.len();
            for record in records {
                if !existing.iter().any(|r| r.id == record.id) {
                    existing.push(record);
                }
            }
            existing.len() - before
        })
        .await
        .unwrap_or(0)
    }

    pub async fn delete(&self, collection: Collection, id: &str) -> bool {
        self.mutate(collection, |existing| {
            let before = existing.len();
            existing.retain(|r| r.id != id);
            existing.len() != before
        })
        .await
        .unwrap_or(false)
    }

    pub async fn set_selected(&self, collection: Collection, id: &str, selected: bool) -> bool {
        self.mutate(collection, |existing| {
            match existing.iter_mut().find(|r| r.id == id) {
                Some(record) => {
                    record.is_selected = selected;
                    true
                }
                None => false,
            }
        })
        .await
        .unwrap_or(false)
    }

    pub async fn replace_all(&self, collection: Collection, records: &[ActionRecord]) -> bool {
        match self.save(collection, records).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write {}: {}", collection.key(), e);
                false
            }
        }
    }

    pub async fn clear(&self, collection: Collection) -> bool {
        match self.store.remove(&[collection.key()]).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear {}: {}", collection.key(), e);
                false
            }
        }
    }

    /// Read-modify-write without isolation against concurrent callers.
    /// Writes back only when `f` reports a change (truthy result).
    async fn mutate<T, F>(&self, collection: Collection, f: F) -> Option<T>
    where
        F: FnOnce(&mut Vec<ActionRecord>) -> T,
        T: Changed,
    {
        let mut records = match self.load(collection).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read {}: {}", collection.key(), e);
                return None;
            }
        };
        let outcome = f(&mut records);
        if outcome.changed()
            && let Err(e) = self.save(collection, &records).await
        {
            warn!("Failed to write {}: {}", collection.key(), e);
            return None;
        }
        Some(outcome)
    }

    async fn load(&self, collection: Collection) -> Result<Vec<ActionRecord>, StoreError> {
        match self.store.get(collection.key()).await? {
            Some(value) if !value.is_null() => Ok(serde_json::from_value(value)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn save(&self, collection: Collection, records: &[ActionRecord]) -> Result<(), StoreError> {
        let value = serde_json::to_value(records)?;
        self.store.set(collection.key(), value).await
    }
}

trait Changed {
    fn changed(&self) -> bool;
}

impl Changed for bool {
    fn changed(&self) -> bool {
        *self
    }
}

impl Changed for usize {
    fn changed(&self) -> bool {
        *self > 0
    }
}
