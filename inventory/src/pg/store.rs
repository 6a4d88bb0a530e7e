use std::ops::DerefMut;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use super::models::ReservationRow;
use super::schema::{reservations, stock_items};
use crate::error::ReservationError;
use crate::store::InventoryStore;
use crate::types::{ReservationRecord, ReservationStatus};

impl InventoryStore for AsyncPgConnection {
    async fn reservation_for_update(
        &mut self,
        order_id: Uuid,
        stock_item_id: Uuid,
    ) -> Result<Option<ReservationRecord>, ReservationError> {
        let row = reservations::table
            .filter(reservations::order_id.eq(order_id))
            .filter(reservations::stock_item_id.eq(stock_item_id))
            .for_update()
            .first::<ReservationRow>(self)
            .await
            .optional()?;

        row.map(ReservationRecord::try_from).transpose()
    }

    async fn try_withdraw_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ReservationError> {
        // Sufficiency check and decrement in a single conditional statement,
        // so no window exists between checking and applying.
        let affected = diesel::update(
            stock_items::table
                .filter(stock_items::id.eq(stock_item_id))
                .filter(stock_items::available_quantity.ge(quantity)),
        )
        .set((
            stock_items::available_quantity.eq(stock_items::available_quantity - quantity),
            stock_items::updated_at.eq(diesel::dsl::now),
        ))
        .execute(self)
        .await?;

        Ok(affected > 0)
    }

    async fn deposit_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), ReservationError> {
        diesel::update(stock_items::table.filter(stock_items::id.eq(stock_item_id)))
            .set((
                stock_items::available_quantity.eq(stock_items::available_quantity + quantity),
                stock_items::updated_at.eq(diesel::dsl::now),
            ))
            .execute(self)
            .await?;

        Ok(())
    }

    async fn insert_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError> {
        diesel::insert_into(reservations::table)
            .values(ReservationRow::from(record))
            .execute(self)
            .await?;

        Ok(())
    }

    async fn update_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError> {
        diesel::update(reservations::table.filter(reservations::id.eq(record.id)))
            .set((
                reservations::quantity.eq(record.quantity),
                reservations::status.eq(record.status.as_str()),
                reservations::reserved_until.eq(record.reserved_until),
                reservations::updated_at.eq(record.updated_at),
            ))
            .execute(self)
            .await?;

        Ok(())
    }

    async fn extend_reserved(
        &mut self,
        order_id: Uuid,
        reserved_until: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let extended = diesel::update(
            reservations::table
                .filter(reservations::order_id.eq(order_id))
                .filter(reservations::status.eq(ReservationStatus::Reserved.as_str())),
        )
        .set((
            reservations::reserved_until.eq(reserved_until),
            reservations::updated_at.eq(updated_at),
        ))
        .execute(self)
        .await?;

        Ok(extended)
    }

    async fn reserved_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        let rows = reservations::table
            .filter(reservations::order_id.eq(order_id))
            .filter(reservations::status.eq(ReservationStatus::Reserved.as_str()))
            .for_update()
            .load::<ReservationRow>(self)
            .await?;

        rows.into_iter().map(ReservationRecord::try_from).collect()
    }

    async fn expired_reserved(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        let rows = reservations::table
            .filter(reservations::status.eq(ReservationStatus::Reserved.as_str()))
            .filter(reservations::reserved_until.lt(now))
            .filter(reservations::quantity.gt(0))
            .for_update()
            .load::<ReservationRow>(self)
            .await?;

        rows.into_iter().map(ReservationRecord::try_from).collect()
    }

    async fn mark_released(
        &mut self,
        ids: &[Uuid],
        updated_at: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        diesel::update(reservations::table.filter(reservations::id.eq_any(ids)))
            .set((
                reservations::status.eq(ReservationStatus::Released.as_str()),
                reservations::updated_at.eq(updated_at),
            ))
            .execute(self)
            .await?;

        Ok(())
    }

    async fn finalize_reserved(
        &mut self,
        order_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let finalized = diesel::update(
            reservations::table
                .filter(reservations::order_id.eq(order_id))
                .filter(reservations::status.eq(ReservationStatus::Reserved.as_str())),
        )
        .set((
            reservations::status.eq(ReservationStatus::Finalized.as_str()),
            reservations::updated_at.eq(updated_at),
        ))
        .execute(self)
        .await?;

        Ok(finalized)
    }
}

/// diesel-async's `AsyncConnection` blanket impl for `DerefMut` wrappers
/// resolves `Self` in transaction callbacks to the pooled connection itself
/// rather than the connection it wraps, so `InventoryStore` needs its own
/// forwarding impl here for `reserve_for_order` et al. to type-check.
impl InventoryStore for PooledConnection<'_, AsyncPgConnection> {
    async fn reservation_for_update(
        &mut self,
        order_id: Uuid,
        stock_item_id: Uuid,
    ) -> Result<Option<ReservationRecord>, ReservationError> {
        self.deref_mut()
            .reservation_for_update(order_id, stock_item_id)
            .await
    }

    async fn try_withdraw_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ReservationError> {
        self.deref_mut()
            .try_withdraw_stock(stock_item_id, quantity)
            .await
    }

    async fn deposit_stock(
        &mut self,
        stock_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), ReservationError> {
        self.deref_mut().deposit_stock(stock_item_id, quantity).await
    }

    async fn insert_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError> {
        self.deref_mut().insert_reservation(record).await
    }

    async fn update_reservation(
        &mut self,
        record: &ReservationRecord,
    ) -> Result<(), ReservationError> {
        self.deref_mut().update_reservation(record).await
    }

    async fn extend_reserved(
        &mut self,
        order_id: Uuid,
        reserved_until: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        self.deref_mut()
            .extend_reserved(order_id, reserved_until, updated_at)
            .await
    }

    async fn reserved_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        self.deref_mut().reserved_for_order(order_id).await
    }

    async fn expired_reserved(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        self.deref_mut().expired_reserved(now).await
    }

    async fn mark_released(
        &mut self,
        ids: &[Uuid],
        updated_at: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        self.deref_mut().mark_released(ids, updated_at).await
    }

    async fn finalize_reserved(
        &mut self,
        order_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        self.deref_mut().finalize_reserved(order_id, updated_at).await
    }
}
