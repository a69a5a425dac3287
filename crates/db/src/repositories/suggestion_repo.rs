//! Repository for the `suggestions` table.

use roomcraft_core::room::SuggestionDraft;
use roomcraft_core::types::DbId;
use sqlx::PgPool;

use crate::models::suggestion::Suggestion;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, project_id, title, description, category, impact, cost, is_selected, created_at";

/// Outcome of [`SuggestionRepo::insert_batch`].
#[derive(Debug)]
pub enum BatchInsert {
    /// The batch was written; rows are in input order.
    Inserted(Vec<Suggestion>),
    /// The project already owns a suggestion batch; nothing was written.
    AlreadyPresent,
    /// No project with the given id exists; nothing was written.
    ProjectMissing,
}

/// Provides batch insert, lookup and selection for suggestions.
pub struct SuggestionRepo;

impl SuggestionRepo {
    /// Insert a project's whole suggestion batch in one transaction.
    ///
    /// The project row's `suggestions_batch_at` is claimed first. The claiming
    /// `UPDATE` row-locks the project, so concurrent batches for the same
    /// project serialize and every one after the first sees the claim and
    /// writes nothing.
    pub async fn insert_batch(
        pool: &PgPool,
        project_id: DbId,
        drafts: &[SuggestionDraft],
    ) -> Result<BatchInsert, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE projects SET suggestions_batch_at = NOW() \
             WHERE id = $1 AND suggestions_batch_at IS NULL",
        )
        .bind(project_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
                    .bind(project_id)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return Ok(if exists {
                BatchInsert::AlreadyPresent
            } else {
                BatchInsert::ProjectMissing
            });
        }

        let query = format!(
            "INSERT INTO suggestions (project_id, title, description, category, impact, cost) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );

        let mut rows = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let row = sqlx::query_as::<_, Suggestion>(&query)
                .bind(project_id)
                .bind(&draft.title)
                .bind(&draft.description)
                .bind(draft.category.as_str())
                .bind(draft.impact.as_str())
                .bind(draft.cost.as_str())
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;
        Ok(BatchInsert::Inserted(rows))
    }

    /// List all suggestions of a project in insertion order.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Suggestion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM suggestions WHERE project_id = $1 ORDER BY id");
        sqlx::query_as::<_, Suggestion>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// List the suggestions of a project whose ids are in `ids`.
    ///
    /// Ids belonging to other projects are silently excluded.
    pub async fn list_subset(
        pool: &PgPool,
        project_id: DbId,
        ids: &[DbId],
    ) -> Result<Vec<Suggestion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM suggestions \
             WHERE project_id = $1 AND id = ANY($2) \
             ORDER BY id"
        );
        sqlx::query_as::<_, Suggestion>(&query)
            .bind(project_id)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Set `is_selected = true` on the given suggestions of a project.
    ///
    /// Never clears the flag. Returns the number of rows matched.
    pub async fn mark_selected(
        pool: &PgPool,
        project_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE suggestions SET is_selected = TRUE \
             WHERE project_id = $1 AND id = ANY($2)",
        )
        .bind(project_id)
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
