use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use figura_core::Result;

/// Namespace for name-derived asset ids.
const ASSET_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_3a52_8d0e_4b7a_9f21_5e83_c4d0_a917);

/// Stable id of the asset `name` of kind `kind` (`"figure"`, `"animation"`, ...).
#[must_use]
pub fn asset_uuid(kind: &str, name: &str) -> Uuid {
    Uuid::new_v5(&ASSET_NAMESPACE, format!("{kind}/{name}").as_bytes())
}

/// Thread-safe store of shared, immutable assets, deduplicated by id.
pub struct AssetStorage<T> {
    assets: RwLock<FxHashMap<Uuid, Arc<T>>>,
}

impl<T> Default for AssetStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssetStorage<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: RwLock::default(),
        }
    }

    /// Adds an asset under `uuid`. An asset already stored under that id wins.
    pub fn add_with_uuid(&self, uuid: Uuid, asset: T) -> Arc<T> {
        Arc::clone(
            self.assets
                .write()
                .entry(uuid)
                .or_insert_with(|| Arc::new(asset)),
        )
    }

    /// Returns the asset stored under `uuid`, loading and storing it on a miss.
    ///
    /// `load` runs without the lock held; when two callers race, the first
    /// insert wins and both receive the same `Arc`.
    pub fn get_or_try_insert<F>(&self, uuid: Uuid, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(existing) = self.get(&uuid) {
            return Ok(existing);
        }
        let asset = load()?;
        Ok(self.add_with_uuid(uuid, asset))
    }

    #[must_use]
    pub fn get(&self, uuid: &Uuid) -> Option<Arc<T>> {
        self.assets.read().get(uuid).cloned()
    }

    /// Drops the store's reference; holders of the `Arc` keep the asset alive.
    pub fn remove(&self, uuid: &Uuid) -> Option<Arc<T>> {
        self.assets.write().remove(uuid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_core::FiguraError;

    #[test]
    fn uuids_are_stable_and_kind_scoped() {
        assert_eq!(asset_uuid("figure", "shirt"), asset_uuid("figure", "shirt"));
        assert_ne!(asset_uuid("figure", "shirt"), asset_uuid("animation", "shirt"));
    }

    #[test]
    fn loads_once_per_uuid() {
        let storage: AssetStorage<String> = AssetStorage::new();
        let id = asset_uuid("figure", "shirt");

        let a = storage
            .get_or_try_insert(id, || Ok("shirt".to_string()))
            .unwrap();
        let b = storage
            .get_or_try_insert(id, || panic!("already cached"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn failed_load_stores_nothing() {
        let storage: AssetStorage<String> = AssetStorage::new();
        let id = asset_uuid("figure", "ghost");
        let result =
            storage.get_or_try_insert(id, || Err(FiguraError::AssetNotFound("ghost".into())));
        assert!(result.is_err());
        assert!(storage.is_empty());
        assert!(storage.get(&id).is_none());
    }

    #[test]
    fn first_insert_wins() {
        let storage: AssetStorage<String> = AssetStorage::new();
        let id = asset_uuid("animation", "idle");
        let first = storage.add_with_uuid(id, "first".to_string());
        let second = storage.add_with_uuid(id, "second".to_string());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, "first");

        assert!(storage.remove(&id).is_some());
        assert_eq!(*first, "first");
        assert!(storage.is_empty());
    }
}
