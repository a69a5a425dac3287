//! Suggestion entity model.

use roomcraft_core::room::{CostTier, SuggestionCategory, SuggestionImpact, SuggestionText};
use roomcraft_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A suggestion row from the `suggestions` table.
///
/// Enum columns are stored as `TEXT` guarded by `CHECK` constraints and
/// decoded through the core enums' `TryFrom<String>` impls.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Suggestion {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: SuggestionCategory,
    #[sqlx(try_from = "String")]
    pub impact: SuggestionImpact,
    #[sqlx(try_from = "String")]
    pub cost: CostTier,
    pub is_selected: bool,
    pub created_at: Timestamp,
}

impl SuggestionText for Suggestion {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }
}
