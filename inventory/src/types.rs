use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReservationError;

/// One requested line of a reserve call: how many units of which stock item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReservationLine {
    pub stock_item_id: Uuid,
    pub quantity: i32,
}

impl ReservationLine {
    pub fn new(stock_item_id: Uuid, quantity: i32) -> Self {
        Self { stock_item_id, quantity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Reserved,
    Released,
    Finalized,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Released => "released",
            ReservationStatus::Finalized => "finalized",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReservationError> {
        match s {
            "reserved" => Ok(ReservationStatus::Reserved),
            "released" => Ok(ReservationStatus::Released),
            "finalized" => Ok(ReservationStatus::Finalized),
            other => Err(ReservationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A ledger row: the hold one order has on one stock item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stock_item_id: Uuid,
    pub quantity: i32,
    pub status: ReservationStatus,
    pub reserved_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
