use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CartRepository;
use crate::errors::ServiceError;
use crate::models::cart::RawCartEntry;

/// Cart held in process memory
#[derive(Debug, Default)]
pub struct InMemoryCartRepository {
    entries: RwLock<Vec<RawCartEntry>>,
}

impl InMemoryCartRepository {
    pub fn new(entries: Vec<RawCartEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn add(&self, entry: RawCartEntry) {
        self.entries.write().await.push(entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn snapshot(&self) -> Result<Vec<RawCartEntry>, ServiceError> {
        Ok(self.entries.read().await.clone())
    }

    async fn clear(&self) -> Result<(), ServiceError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cart::{FlatCartItem, RawAmount};

    fn entry(id: &str) -> RawCartEntry {
        RawCartEntry::Flattened(FlatCartItem {
            product_id: id.into(),
            name: "Item".into(),
            unit_price: Some(RawAmount::Int(100)),
            quantity: Some(RawAmount::Int(1)),
            sku: None,
            variation_id: None,
            variation_name: None,
        })
    }

    #[tokio::test]
    async fn snapshot_is_a_copy() {
        let repo = InMemoryCartRepository::new(vec![entry("p1")]);
        let snapshot = repo.snapshot().await.unwrap();
        repo.add(entry("p2")).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(repo.len().await, 2);

        repo.clear().await.unwrap();
        assert!(repo.is_empty().await);
    }
}
