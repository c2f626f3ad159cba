//! Product purchase model.

use drip_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `purchases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Purchase {
    pub id: DbId,
    pub learner_id: DbId,
    pub product_id: DbId,
    pub purchased_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for recording a purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchase {
    pub learner_id: DbId,
    pub product_id: DbId,
    pub purchased_at: Timestamp,
}
