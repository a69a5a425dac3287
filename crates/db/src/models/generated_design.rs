//! Generated design entity model.

use roomcraft_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `generated_designs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct GeneratedDesign {
    pub id: DbId,
    pub project_id: DbId,
    pub image_url: String,
    /// The image prompt that produced `image_url`.
    pub prompt: String,
    pub created_at: Timestamp,
}
