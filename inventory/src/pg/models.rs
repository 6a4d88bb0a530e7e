use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReservationError;
use crate::types::{ReservationRecord, ReservationStatus};

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::pg::schema::stock_items)]
pub struct StockItemRow {
    pub id: Uuid,
    pub name: String,
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable)]
#[diesel(table_name = crate::pg::schema::reservations)]
pub struct ReservationRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stock_item_id: Uuid,
    pub quantity: i32,
    pub status: String,
    pub reserved_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for ReservationRecord {
    type Error = ReservationError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            stock_item_id: row.stock_item_id,
            quantity: row.quantity,
            status: ReservationStatus::parse(&row.status)?,
            reserved_until: row.reserved_until,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&ReservationRecord> for ReservationRow {
    fn from(record: &ReservationRecord) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id,
            stock_item_id: record.stock_item_id,
            quantity: record.quantity,
            status: record.status.as_str().to_string(),
            reserved_until: record.reserved_until,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
