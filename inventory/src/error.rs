use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the reservation subsystem.
///
/// `InsufficientStock` and `NoActiveReservation` are logical outcomes the
/// caller is expected to handle; `Database` and `Pool` are transient store
/// failures (lock waits, serialization conflicts, checkout timeouts) that
/// callers may retry with backoff.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("insufficient stock for item {stock_item_id}: requested {requested}")]
    InsufficientStock { stock_item_id: Uuid, requested: i32 },

    #[error("no active reservation for order {order_id}")]
    NoActiveReservation { order_id: Uuid },

    #[error("reservation for order {order_id}, item {stock_item_id} is already finalized")]
    AlreadyFinalized { order_id: Uuid, stock_item_id: Uuid },

    #[error("unknown reservation status {0:?}")]
    UnknownStatus(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<diesel_async::pooled_connection::PoolError>),
}
