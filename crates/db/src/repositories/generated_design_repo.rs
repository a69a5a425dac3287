//! Repository for the `generated_designs` table.

use roomcraft_core::types::DbId;
use sqlx::PgPool;

use crate::models::generated_design::GeneratedDesign;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, image_url, prompt, created_at";

/// Provides append and listing operations for generated designs.
pub struct GeneratedDesignRepo;

impl GeneratedDesignRepo {
    /// Append a generated design to a project.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
    ) -> Result<GeneratedDesign, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_designs (project_id, image_url, prompt)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedDesign>(&query)
            .bind(project_id)
            .bind(image_url)
            .bind(prompt)
            .fetch_one(pool)
            .await
    }

    /// Append a design and flag the suggestions it applied, in one
    /// transaction.
    ///
    /// Only suggestions of `project_id` are flagged; the design row and the
    /// flags are either both written or neither is.
    pub async fn create_with_selection(
        pool: &PgPool,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
        suggestion_ids: &[DbId],
    ) -> Result<GeneratedDesign, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO generated_designs (project_id, image_url, prompt) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let design = sqlx::query_as::<_, GeneratedDesign>(&query)
            .bind(project_id)
            .bind(image_url)
            .bind(prompt)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE suggestions SET is_selected = TRUE \
             WHERE project_id = $1 AND id = ANY($2)",
        )
        .bind(project_id)
        .bind(suggestion_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(design)
    }

    /// List a project's designs, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<GeneratedDesign>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_designs \
             WHERE project_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, GeneratedDesign>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
