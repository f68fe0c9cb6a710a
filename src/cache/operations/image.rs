use std::collections::HashSet;
use std::sync::Arc;

use rand::{Rng, distributions::Alphanumeric};

use crate::cache::keys::IMAGE_LIST_KEY;
use crate::cache::models::CachedImage;
use crate::cache::store::CacheStore;
use crate::error::AppError;

const ID_LEN: usize = 10;

/// 图片结果缓存操作
///
/// 缓存只是优化：未配置存储或存储出错时，`store` 返回 `None`，
/// `lookup` 视为未命中，都不会向调用方抛错。
#[derive(Clone)]
pub struct ImageCacheOperations {
    store: Option<Arc<dyn CacheStore>>,
    capacity: usize,
}

impl ImageCacheOperations {
    pub fn new(store: Arc<dyn CacheStore>, capacity: usize) -> Self {
        Self {
            store: Some(store),
            capacity: capacity.max(1),
        }
    }

    pub fn disabled() -> Self {
        Self {
            store: None,
            capacity: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// 缓存图片 URL，返回新分配的 id
    pub async fn store(&self, url: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match self.try_store(store.as_ref(), url).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to cache image url, skipping");
                None
            }
        }
    }

    /// 按 id 查找缓存的图片 URL
    pub async fn lookup(&self, id: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match load(store.as_ref()).await {
            Ok(images) => images.into_iter().find(|img| img.id == id).map(|img| img.url),
            Err(e) => {
                tracing::warn!(error = %e, "image cache lookup failed");
                None
            }
        }
    }

    async fn try_store(&self, store: &dyn CacheStore, url: &str) -> Result<String, AppError> {
        let mut images = load(store).await?;

        let taken: HashSet<&str> = images.iter().map(|img| img.id.as_str()).collect();
        let id = new_id(&taken);

        // 先淘汰最旧的条目，再追加
        while images.len() >= self.capacity {
            images.remove(0);
        }
        images.push(CachedImage {
            id: id.clone(),
            url: url.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        });

        let json = serde_json::to_string(&images)?;
        store.put(IMAGE_LIST_KEY, json).await?;

        tracing::debug!(id = %id, entries = images.len(), "cached image url");
        Ok(id)
    }
}

async fn load(store: &dyn CacheStore) -> Result<Vec<CachedImage>, AppError> {
    match store.get(IMAGE_LIST_KEY).await? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

/// 生成与现有条目不冲突的随机 id
fn new_id(taken: &HashSet<&str>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let id: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();
        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;

    fn memory_cache(capacity: usize) -> ImageCacheOperations {
        ImageCacheOperations::new(Arc::new(MemoryStore::new()), capacity)
    }

    #[tokio::test]
    async fn store_then_lookup() {
        let cache = memory_cache(1000);
        let id = cache.store("https://img.example/1.png").await.unwrap();

        assert!(id.len() >= 8);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(
            cache.lookup(&id).await.as_deref(),
            Some("https://img.example/1.png")
        );
        assert_eq!(cache.lookup("missing").await, None);
    }

    #[tokio::test]
    async fn evicts_oldest_beyond_capacity() {
        let store = Arc::new(MemoryStore::new());
        let cache = ImageCacheOperations::new(store.clone(), 1000);

        let mut ids = Vec::new();
        for i in 0..1001 {
            ids.push(cache.store(&format!("https://img.example/{}.png", i)).await.unwrap());
        }

        let images = load(&*store).await.unwrap();
        assert_eq!(images.len(), 1000);
        assert_eq!(images[0].id, ids[1]);
        assert_eq!(cache.lookup(&ids[0]).await, None);
        assert_eq!(
            cache.lookup(&ids[1000]).await.as_deref(),
            Some("https://img.example/1000.png")
        );

        // 工作集内 id 不重复
        let unique: HashSet<&str> = images.iter().map(|img| img.id.as_str()).collect();
        assert_eq!(unique.len(), images.len());
    }

    #[tokio::test]
    async fn disabled_cache_is_a_no_op() {
        let cache = ImageCacheOperations::disabled();
        assert!(!cache.is_enabled());
        assert_eq!(cache.store("https://img.example/x.png").await, None);
        assert_eq!(cache.lookup("anything").await, None);
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::CacheUnavailable("connection refused".into()))
        }

        async fn put(&self, _key: &str, _value: String) -> Result<(), AppError> {
            Err(AppError::CacheUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_errors_degrade_to_absent() {
        let cache = ImageCacheOperations::new(Arc::new(BrokenStore), 10);
        assert_eq!(cache.store("https://img.example/x.png").await, None);
        assert_eq!(cache.lookup("abc").await, None);
    }

    #[tokio::test]
    async fn corrupt_payload_is_treated_as_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.put(IMAGE_LIST_KEY, "not json".into()).await.unwrap();
        let cache = ImageCacheOperations::new(store, 10);
        assert_eq!(cache.lookup("abc").await, None);
    }

    #[test]
    fn new_id_skips_taken_ids() {
        let mut taken = HashSet::new();
        let first = new_id(&taken);
        taken.insert(first.as_str());
        let second = new_id(&taken);
        assert_ne!(first, second);
        assert_eq!(second.len(), ID_LEN);
    }
}
