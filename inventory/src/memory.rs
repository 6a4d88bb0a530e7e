use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::ReservationError;
use crate::store::InventoryStore;
use crate::types::{ReservationRecord, ReservationStatus};

#[derive(Default)]
struct MemoryState {
    stock: HashMap<Uuid, i32>,
    ledger: Vec<ReservationRecord>,
}

/// In-memory implementation of the store contract.
///
/// A session holds the whole-store lock, so concurrent sessions serialize
/// the way transactions do at serializable isolation. Every contract
/// primitive validates before it writes, so a failed operation leaves no
/// partial state behind and no rollback machinery is needed.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_stock_item(&self, stock_item_id: Uuid, available_quantity: i32) {
        self.state
            .lock()
            .await
            .stock
            .insert(stock_item_id, available_quantity);
    }

    pub async fn available(&self, stock_item_id: Uuid) -> Option<i32> {
        self.state.lock().await.stock.get(&stock_item_id).copied()
    }

    pub async fn record(
        &self,
        order_id: Uuid,
        stock_item_id: Uuid,
    ) -> Option<ReservationRecord> {
        self.state
            .lock()
            .await
            .ledger
            .iter()
            .find(|row| row.order_id == order_id && row.stock_item_id == stock_item_id)
            .cloned()
    }

    pub async fn records(&self) -> Vec<ReservationRecord> {
        self.state.lock().await.ledger.clone()
    }

    /// Open a session. Blocks until every other session has finished.
    pub async fn session(&self) -> MemorySession {
        MemorySession {
            state: self.state.clone().lock_owned().await,
        }
    }
}

pub struct MemorySession {
    state: OwnedMutexGuard<MemoryState>,
}

impl InventoryStore for MemorySession {
    async fn reservation_for_update(
        &mut self,
        order_id: Uuid,
        stock_item_id: Uuid,
    ) -> Result<Option<ReservationRecord>, ReservationError> {
        Ok(self
            .state
            .ledger
            .iter()
            .find(|row| row.order_id == order_id && row.stock_item_id == stock_item_id)
            .cloned())
    }

    async fn try_withdraw_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ReservationError> {
        match self.state.stock.get_mut(&stock_item_id) {
            Some(available) if *available >= quantity => {
                *available -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deposit_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), ReservationError> {
        if let Some(available) = self.state.stock.get_mut(&stock_item_id) {
            *available += quantity;
        }
        Ok(())
    }

    async fn insert_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError> {
        self.state.ledger.push(record.clone());
        Ok(())
    }

    async fn update_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError> {
        if let Some(row) = self.state.ledger.iter_mut().find(|row| row.id == record.id) {
            *row = record.clone();
        }
        Ok(())
    }

    async fn extend_reserved(
        &mut self,
        order_id: Uuid,
        reserved_until: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let mut extended = 0;
        for row in self
            .state
            .ledger
            .iter_mut()
            .filter(|row| row.order_id == order_id && row.status == ReservationStatus::Reserved)
        {
            row.reserved_until = reserved_until;
            row.updated_at = updated_at;
            extended += 1;
        }
        Ok(extended)
    }

    async fn reserved_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        Ok(self
            .state
            .ledger
            .iter()
            .filter(|row| row.order_id == order_id && row.status == ReservationStatus::Reserved)
            .cloned()
            .collect())
    }

    async fn expired_reserved(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        Ok(self
            .state
            .ledger
            .iter()
            .filter(|row| {
                row.status == ReservationStatus::Reserved
                    && row.reserved_until < now
                    && row.quantity > 0
            })
            .cloned()
            .collect())
    }

    async fn mark_released(
        &mut self,
        ids: &[Uuid],
        updated_at: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        for row in self
            .state
            .ledger
            .iter_mut()
            .filter(|row| ids.contains(&row.id))
        {
            row.status = ReservationStatus::Released;
            row.updated_at = updated_at;
        }
        Ok(())
    }

    async fn finalize_reserved(
        &mut self,
        order_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let mut finalized = 0;
        for row in self
            .state
            .ledger
            .iter_mut()
            .filter(|row| row.order_id == order_id && row.status == ReservationStatus::Reserved)
        {
            row.status = ReservationStatus::Finalized;
            row.updated_at = updated_at;
            finalized += 1;
        }
        Ok(finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn withdraw_respects_the_guard() {
        let store = MemoryStore::new();
        let item = Uuid::new_v4();
        store.put_stock_item(item, 3).await;

        let mut session = store.session().await;
        assert!(session.try_withdraw_stock(item, 3).await.unwrap());
        assert!(!session.try_withdraw_stock(item, 1).await.unwrap());
        drop(session);

        assert_eq!(store.available(item).await, Some(0));
    }

    #[tokio::test]
    async fn withdraw_from_unknown_item_fails_without_effect() {
        let store = MemoryStore::new();
        let mut session = store.session().await;
        assert!(!session.try_withdraw_stock(Uuid::new_v4(), 1).await.unwrap());
    }
}
