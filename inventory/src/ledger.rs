use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ReservationError;
use crate::store::InventoryStore;
use crate::types::{ReservationLine, ReservationRecord, ReservationStatus};

/// Reserve every line of an order against available stock.
///
/// Lines are processed independently; a line failing with
/// `InsufficientStock` aborts the call but does not undo earlier lines.
/// Lines with a non-positive quantity are skipped.
pub async fn reserve_for_order<S: InventoryStore>(
    store: &mut S,
    order_id: Uuid,
    lines: &[ReservationLine],
    now: DateTime<Utc>,
    reserved_until: DateTime<Utc>,
) -> Result<(), ReservationError> {
    for line in lines {
        reserve_line(store, order_id, *line, now, reserved_until).await?;
    }
    Ok(())
}

/// Reserve a single (order, stock item) line.
///
/// A fresh line withdraws the full quantity; an existing line is adjusted by
/// the difference against its currently held quantity (zero if the line was
/// released earlier), so raising a hold from 5 to 8 withdraws exactly 3 and
/// lowering it to 2 deposits 3 back. The withdraw side runs under the
/// store's sufficiency guard and fails with `InsufficientStock` when the
/// counter is short.
pub async fn reserve_line<S: InventoryStore>(
    store: &mut S,
    order_id: Uuid,
    line: ReservationLine,
    now: DateTime<Utc>,
    reserved_until: DateTime<Utc>,
) -> Result<(), ReservationError> {
    if line.quantity <= 0 {
        return Ok(());
    }

    match store
        .reservation_for_update(order_id, line.stock_item_id)
        .await?
    {
        None => {
            if !store
                .try_withdraw_stock(line.stock_item_id, line.quantity)
                .await?
            {
                return Err(ReservationError::InsufficientStock {
                    stock_item_id: line.stock_item_id,
                    requested: line.quantity,
                });
            }

            let record = ReservationRecord {
                id: Uuid::new_v4(),
                order_id,
                stock_item_id: line.stock_item_id,
                quantity: line.quantity,
                status: ReservationStatus::Reserved,
                reserved_until,
                created_at: now,
                updated_at: now,
            };
            store.insert_reservation(&record).await?;

            debug!(
                "Reserved {} unit(s) of {} for order {}",
                line.quantity, line.stock_item_id, order_id
            );
        }
        Some(mut record) => {
            if record.status == ReservationStatus::Finalized {
                return Err(ReservationError::AlreadyFinalized {
                    order_id,
                    stock_item_id: line.stock_item_id,
                });
            }

            let effective_old = match record.status {
                ReservationStatus::Reserved => record.quantity,
                _ => 0,
            };
            let diff = line.quantity - effective_old;

            if diff > 0 {
                if !store.try_withdraw_stock(line.stock_item_id, diff).await? {
                    return Err(ReservationError::InsufficientStock {
                        stock_item_id: line.stock_item_id,
                        requested: diff,
                    });
                }
            } else if diff < 0 {
                store.deposit_stock(line.stock_item_id, -diff).await?;
            }

            record.quantity = line.quantity;
            record.status = ReservationStatus::Reserved;
            record.reserved_until = reserved_until;
            record.updated_at = now;
            store.update_reservation(&record).await?;

            debug!(
                "Re-reserved {} unit(s) of {} for order {} (adjustment {})",
                line.quantity, line.stock_item_id, order_id, diff
            );
        }
    }

    Ok(())
}

/// Push the expiry deadline of an order's active reservations forward.
///
/// Extending an order with nothing reserved is a sequencing error on the
/// caller's side (the hold was already swept or released) and fails with
/// `NoActiveReservation`.
pub async fn extend_reservation<S: InventoryStore>(
    store: &mut S,
    order_id: Uuid,
    new_reserved_until: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<usize, ReservationError> {
    let extended = store
        .extend_reserved(order_id, new_reserved_until, now)
        .await?;
    if extended == 0 {
        return Err(ReservationError::NoActiveReservation { order_id });
    }

    debug!(
        "Extended {} reservation line(s) for order {} until {}",
        extended, order_id, new_reserved_until
    );
    Ok(extended)
}

/// Return an order's held stock and mark its reservations released.
///
/// Idempotent: a second call finds no active lines and returns 0.
pub async fn release_reservation<S: InventoryStore>(
    store: &mut S,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<usize, ReservationError> {
    let rows = store.reserved_for_order(order_id).await?;
    release_rows(store, &rows, now).await?;

    if !rows.is_empty() {
        info!(
            "Released {} reservation line(s) for order {}",
            rows.len(),
            order_id
        );
    }
    Ok(rows.len())
}

/// Release every reservation whose deadline has passed, across all orders.
pub async fn release_expired_reservations<S: InventoryStore>(
    store: &mut S,
    now: DateTime<Utc>,
) -> Result<usize, ReservationError> {
    let rows = store.expired_reserved(now).await?;
    release_rows(store, &rows, now).await?;

    if !rows.is_empty() {
        info!("Released {} expired reservation line(s)", rows.len());
    }
    Ok(rows.len())
}

async fn release_rows<S: InventoryStore>(
    store: &mut S,
    rows: &[ReservationRecord],
    now: DateTime<Utc>,
) -> Result<(), ReservationError> {
    if rows.is_empty() {
        return Ok(());
    }

    for row in rows {
        if row.quantity > 0 {
            store.deposit_stock(row.stock_item_id, row.quantity).await?;
        }
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    store.mark_released(&ids, now).await
}

/// Convert an order's active reservations into committed sales.
///
/// Stock counters stay where reservation left them; the rows just flip to
/// the terminal `Finalized` status. An order with nothing reserved is a
/// successful no-op.
pub async fn finalize_reservation<S: InventoryStore>(
    store: &mut S,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<usize, ReservationError> {
    let finalized = store.finalize_reserved(order_id, now).await?;

    if finalized > 0 {
        info!(
            "Finalized {} reservation line(s) for order {}",
            finalized, order_id
        );
    }
    Ok(finalized)
}
