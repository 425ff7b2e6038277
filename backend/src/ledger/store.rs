use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::position::{LedgerEntry, Position};

/// Failures of a [`PositionRepository`] backend. The in-memory repository
/// never fails; durable backends report outages as `Unavailable`, which the
/// API surfaces as a 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("position store unavailable: {0}")]
    Unavailable(String),
}

/// Storage seam for positions and the transition journal.
#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn find(&self, address: &str) -> Result<Option<Position>, StoreError>;

    async fn list(&self) -> Result<Vec<Position>, StoreError>;

    /// Persists the new position state together with the entry that produced it.
    async fn commit(&self, position: Position, entry: LedgerEntry) -> Result<(), StoreError>;

    /// All journal entries, oldest first.
    async fn entries(&self) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Most recent entries first, optionally filtered by address.
    async fn history(
        &self,
        address: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn entry_count(&self) -> Result<u64, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryPositionRepository {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    positions: HashMap<String, Position>,
    journal: Vec<LedgerEntry>,
}

impl InMemoryPositionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn find(&self, address: &str) -> Result<Option<Position>, StoreError> {
        Ok(self.state.read().await.positions.get(address).cloned())
    }

    async fn list(&self) -> Result<Vec<Position>, StoreError> {
        let state = self.state.read().await;
        let mut positions: Vec<Position> = state.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(positions)
    }

    async fn commit(&self, position: Position, entry: LedgerEntry) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.positions.insert(position.address.clone(), position);
        state.journal.push(entry);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self.state.read().await.journal.clone())
    }

    async fn history(
        &self,
        address: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .journal
            .iter()
            .rev()
            .filter(|entry| address.map_or(true, |address| entry.address == address))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn entry_count(&self) -> Result<u64, StoreError> {
        Ok(self.state.read().await.journal.len() as u64)
    }
}
