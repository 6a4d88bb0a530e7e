pub mod models;
pub mod schema;

mod store;

use chrono::{DateTime, Utc};
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use uuid::Uuid;

use crate::error::ReservationError;
use crate::ledger;
use crate::types::ReservationLine;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<AsyncPgConnection>;

/// Pool-owning entry point for the reservation operations.
///
/// Each method checks a connection out of the pool and runs its work inside
/// its own transaction. `reserve_for_order` opens one transaction per line,
/// so a later out-of-stock line does not roll earlier lines back.
///
/// To participate in a transaction the caller already holds (reserving in
/// the same transaction that writes the order row, say), call the `ledger`
/// functions directly on that connection instead; a transaction scope opened
/// inside yours becomes a savepoint and commits only with your commit.
#[derive(Clone)]
pub struct Reservations {
    pool: DbPool,
}

impl Reservations {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn reserve_for_order(
        &self,
        order_id: Uuid,
        lines: &[ReservationLine],
        now: DateTime<Utc>,
        reserved_until: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        let mut conn = self.pool.get().await?;

        for line in lines {
            let line = *line;
            conn.transaction::<_, ReservationError, _>(|conn| {
                Box::pin(async move {
                    ledger::reserve_line(conn, order_id, line, now, reserved_until).await
                })
            })
            .await?;
        }

        Ok(())
    }

    pub async fn extend_reservation(
        &self,
        order_id: Uuid,
        new_reserved_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, ReservationError, _>(|conn| {
            Box::pin(async move {
                ledger::extend_reservation(conn, order_id, new_reserved_until, now).await
            })
        })
        .await
    }

    pub async fn release_reservation(
        &self,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, ReservationError, _>(|conn| {
            Box::pin(async move { ledger::release_reservation(conn, order_id, now).await })
        })
        .await
    }

    pub async fn release_expired_reservations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, ReservationError, _>(|conn| {
            Box::pin(async move { ledger::release_expired_reservations(conn, now).await })
        })
        .await
    }

    pub async fn finalize_reservation(
        &self,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<usize, ReservationError> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, ReservationError, _>(|conn| {
            Box::pin(async move { ledger::finalize_reservation(conn, order_id, now).await })
        })
        .await
    }
}
