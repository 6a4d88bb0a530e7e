use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ReservationError;
use crate::types::ReservationRecord;

/// The atomic-update contract the ledger operations run against.
///
/// An implementation represents a session that is already serialized against
/// concurrent writers: the Postgres backend is a connection inside an open
/// transaction (row locks plus conditional updates do the serializing), the
/// in-memory backend holds the whole-store lock for the session's lifetime.
///
/// `try_withdraw_stock` is the one primitive that carries the no-negative
/// guarantee: the sufficiency check and the decrement must be indivisible.
#[allow(async_fn_in_trait)]
pub trait InventoryStore {
    /// Fetch the ledger row for (order, stock item), locked for update.
    async fn reservation_for_update(
        &mut self,
        order_id: Uuid,
        stock_item_id: Uuid,
    ) -> Result<Option<ReservationRecord>, ReservationError>;

    /// Decrement the item's available quantity iff it is at least `quantity`.
    /// Returns `false` without mutating when the guard fails (or the item
    /// does not exist).
    async fn try_withdraw_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ReservationError>;

    /// Credit the item's available quantity. Never blocked by the guard.
    async fn deposit_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), ReservationError>;

    async fn insert_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError>;

    /// Overwrite quantity, status, deadline and `updated_at` on one row.
    async fn update_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError>;

    /// Refresh `reserved_until`/`updated_at` on all `Reserved` rows of the
    /// order. Returns how many rows matched.
    async fn extend_reserved(
        &mut self,
        order_id: Uuid,
        reserved_until: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError>;

    /// All `Reserved` rows of the order, locked for update.
    async fn reserved_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<ReservationRecord>, ReservationError>;

    /// All `Reserved` rows past their deadline with a positive quantity,
    /// locked for update.
    async fn expired_reserved(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationRecord>, ReservationError>;

    async fn mark_released(
        &mut self,
        ids: &[Uuid],
        updated_at: DateTime<Utc>,
    ) -> Result<(), ReservationError>;

    /// Flip all `Reserved` rows of the order to `Finalized`. Returns how many
    /// rows matched.
    async fn finalize_reserved(
        &mut self,
        order_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError>;
}
