use roomcraft_core::room::{CostTier, SuggestionCategory, SuggestionDraft, SuggestionImpact};
use roomcraft_db::models::project::{CreateProject, Project};
use roomcraft_db::repositories::{BatchInsert, GeneratedDesignRepo, ProjectRepo, SuggestionRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_project(pool: &PgPool, user_id: Option<i64>) -> Project {
    let input = CreateProject {
        image_url: "https://uploads.example/room.jpg".to_string(),
        user_id,
    };
    ProjectRepo::create(pool, &input).await.unwrap()
}

fn draft(title: &str) -> SuggestionDraft {
    SuggestionDraft {
        title: title.to_string(),
        description: format!("{title} description"),
        category: SuggestionCategory::Decor,
        impact: SuggestionImpact::Medium,
        cost: CostTier::Low,
    }
}

fn drafts(n: usize) -> Vec<SuggestionDraft> {
    (1..=n).map(|i| draft(&format!("Suggestion {i}"))).collect()
}

async fn suggestion_count(pool: &PgPool, project_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM suggestions WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_ids(pool: &PgPool, project_id: i64, n: usize) -> Vec<i64> {
    match SuggestionRepo::insert_batch(pool, project_id, &drafts(n)).await.unwrap() {
        BatchInsert::Inserted(rows) => rows.iter().map(|s| s.id).collect(),
        other => panic!("expected Inserted, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_check_passes(pool: PgPool) {
    roomcraft_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn find_owned_hides_other_users_projects(pool: PgPool) {
    let project = new_project(&pool, Some(1)).await;

    assert!(ProjectRepo::find_owned(&pool, project.id, 1).await.unwrap().is_some());
    assert!(ProjectRepo::find_owned(&pool, project.id, 2).await.unwrap().is_none());
    assert!(ProjectRepo::find_by_id(&pool, project.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_for_user_is_newest_first(pool: PgPool) {
    let first = new_project(&pool, Some(1)).await;
    let second = new_project(&pool, Some(1)).await;
    new_project(&pool, Some(2)).await;
    new_project(&pool, None).await;

    let ids: Vec<i64> = ProjectRepo::list_for_user(&pool, 1)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

// ---------------------------------------------------------------------------
// Suggestion batches
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_insert_keeps_order_and_defaults(pool: PgPool) {
    let project = new_project(&pool, Some(1)).await;

    let rows = match SuggestionRepo::insert_batch(&pool, project.id, &drafts(6))
        .await
        .unwrap()
    {
        BatchInsert::Inserted(rows) => rows,
        other => panic!("expected Inserted, got {other:?}"),
    };

    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].title, "Suggestion 1");
    assert_eq!(rows[5].title, "Suggestion 6");
    assert!(rows.iter().all(|s| !s.is_selected && s.project_id == project.id));
    assert_eq!(rows[0].cost, CostTier::Low);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_batch_writes_nothing(pool: PgPool) {
    let project = new_project(&pool, Some(1)).await;
    insert_ids(&pool, project.id, 5).await;

    let outcome = SuggestionRepo::insert_batch(&pool, project.id, &drafts(3))
        .await
        .unwrap();

    assert!(matches!(outcome, BatchInsert::AlreadyPresent));
    assert_eq!(suggestion_count(&pool, project.id).await, 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_for_missing_project_writes_nothing(pool: PgPool) {
    let outcome = SuggestionRepo::insert_batch(&pool, 9_999, &drafts(2))
        .await
        .unwrap();

    assert!(matches!(outcome, BatchInsert::ProjectMissing));
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suggestions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_batches_insert_once(pool: PgPool) {
    let project = new_project(&pool, Some(1)).await;
    let a = drafts(4);
    let b = drafts(4);

    let (first, second) = tokio::join!(
        SuggestionRepo::insert_batch(&pool, project.id, &a),
        SuggestionRepo::insert_batch(&pool, project.id, &b),
    );

    let inserted = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|o| matches!(o, BatchInsert::Inserted(_)))
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(suggestion_count(&pool, project.id).await, 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn check_constraint_rejects_unknown_category(pool: PgPool) {
    let project = new_project(&pool, Some(1)).await;

    let result = sqlx::query(
        "INSERT INTO suggestions (project_id, title, description, category, impact, cost) \
         VALUES ($1, 't', 'd', 'plumbing', 'high', '$')",
    )
    .bind(project.id)
    .execute(&pool)
    .await;

    let err = result.unwrap_err();
    let constraint = err.as_database_error().and_then(|e| e.constraint());
    assert_eq!(constraint, Some("ck_suggestions_category"));
}

// ---------------------------------------------------------------------------
// Subsets and selection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn subset_excludes_other_projects_suggestions(pool: PgPool) {
    let mine = new_project(&pool, Some(1)).await;
    let theirs = new_project(&pool, Some(2)).await;
    let my_ids = insert_ids(&pool, mine.id, 3).await;
    let their_ids = insert_ids(&pool, theirs.id, 3).await;

    let subset = SuggestionRepo::list_subset(&pool, mine.id, &[my_ids[0], their_ids[0]])
        .await
        .unwrap();

    assert_eq!(subset.len(), 1);
    assert_eq!(subset[0].id, my_ids[0]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_selected_is_scoped_to_project(pool: PgPool) {
    let mine = new_project(&pool, Some(1)).await;
    let theirs = new_project(&pool, Some(2)).await;
    let my_ids = insert_ids(&pool, mine.id, 3).await;
    let their_ids = insert_ids(&pool, theirs.id, 3).await;

    let matched = SuggestionRepo::mark_selected(&pool, mine.id, &[my_ids[1], their_ids[1]])
        .await
        .unwrap();
    assert_eq!(matched, 1);

    let theirs_selected = SuggestionRepo::list_by_project(&pool, theirs.id)
        .await
        .unwrap()
        .iter()
        .filter(|s| s.is_selected)
        .count();
    assert_eq!(theirs_selected, 0);
}

// ---------------------------------------------------------------------------
// Generated designs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_selection_writes_design_and_flags(pool: PgPool) {
    let project = new_project(&pool, Some(1)).await;
    let ids = insert_ids(&pool, project.id, 6).await;

    let design = GeneratedDesignRepo::create_with_selection(
        &pool,
        project.id,
        "https://cdn/out.png",
        "a bright room",
        &[ids[1], ids[3]],
    )
    .await
    .unwrap();
    assert_eq!(design.prompt, "a bright room");

    let selected: Vec<i64> = SuggestionRepo::list_by_project(&pool, project.id)
        .await
        .unwrap()
        .iter()
        .filter(|s| s.is_selected)
        .map(|s| s.id)
        .collect();
    assert_eq!(selected, vec![ids[1], ids[3]]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_selection_for_missing_project_rolls_back(pool: PgPool) {
    let result =
        GeneratedDesignRepo::create_with_selection(&pool, 9_999, "https://cdn/x.png", "p", &[1])
            .await;
    assert!(result.is_err());

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM generated_designs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn designs_are_listed_newest_first(pool: PgPool) {
    let project = new_project(&pool, Some(1)).await;
    let first = GeneratedDesignRepo::create(&pool, project.id, "https://cdn/1.png", "one")
        .await
        .unwrap();
    let second = GeneratedDesignRepo::create(&pool, project.id, "https://cdn/2.png", "two")
        .await
        .unwrap();

    let ids: Vec<i64> = GeneratedDesignRepo::list_by_project(&pool, project.id)
        .await
        .unwrap()
        .iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
